use std::collections::BTreeMap;

use serde_json::{Value, json};

use wizard_spec::{
    AdvanceOutcome, FormSpec, Submission, SubmissionSink, UsageError, Wizard, is_absent,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "onboarding" => include_str!("../tests/fixtures/onboarding.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn onboarding() -> FormSpec {
    serde_json::from_str(fixture("onboarding")).expect("deserialize")
}

fn wizard() -> Wizard {
    Wizard::new(onboarding()).expect("wizard")
}

fn set(wizard: &mut Wizard, field: &str, value: Value) {
    wizard.set_value(field, value).expect("editable field");
}

fn fill_about_you(wizard: &mut Wizard) {
    set(wizard, "fullName", json!("John Doe"));
    set(wizard, "email", json!("john@x.com"));
    set(wizard, "country", json!("France"));
    set(wizard, "timezone", json!("Europe/Paris"));
}

fn advance(wizard: &mut Wizard) -> AdvanceOutcome {
    wizard.advance().expect("advance is allowed")
}

fn run_to_terminal(wizard: &mut Wizard) -> AdvanceOutcome {
    set(wizard, "accountType", json!("individual"));
    advance(wizard);
    fill_about_you(wizard);
    advance(wizard);
    set(wizard, "help", json!(["automation"]));
    advance(wizard);
    set(wizard, "budget", json!(1500));
    advance(wizard)
}

#[test]
fn end_to_end_individual_account() {
    let mut wizard = wizard();
    assert_eq!(wizard.current_step(), 1);
    assert_eq!(wizard.step_count(), 5);

    set(&mut wizard, "accountType", json!("individual"));
    assert_eq!(advance(&mut wizard), AdvanceOutcome::Advanced { step: 2 });

    fill_about_you(&mut wizard);
    set(&mut wizard, "fullName", json!("Jo"));
    let outcome = advance(&mut wizard);
    assert_eq!(
        outcome.messages(),
        BTreeMap::from([(
            "fullName".to_string(),
            "Your full name must be at least 4 characters long".to_string()
        )])
    );
    assert_eq!(wizard.current_step(), 2);
    assert!(!wizard.accumulated().contains_key("fullName"));

    set(&mut wizard, "fullName", json!("John Doe"));
    assert_eq!(advance(&mut wizard), AdvanceOutcome::Advanced { step: 3 });

    let record = wizard.accumulated();
    for key in [
        "fullName",
        "email",
        "country",
        "timezone",
        "companyName",
        "companySize",
    ] {
        assert!(record.contains_key(key), "missing {}", key);
    }
    assert_eq!(record["fullName"], json!("John Doe"));
    assert_eq!(record["timezone"], json!("Europe/Paris"));
    assert!(is_absent(record.get("companyName")));
    assert!(is_absent(record.get("companySize")));
}

#[test]
fn individual_account_skips_company_fields() {
    let mut wizard = wizard();
    set(&mut wizard, "accountType", json!("individual"));
    advance(&mut wizard);

    assert_eq!(
        wizard.visible_fields(),
        vec!["fullName", "email", "country", "timezone"]
    );
    fill_about_you(&mut wizard);
    assert_eq!(advance(&mut wizard), AdvanceOutcome::Advanced { step: 3 });
}

#[test]
fn startup_account_requires_company_fields() {
    let mut wizard = wizard();
    set(&mut wizard, "accountType", json!("startup"));
    advance(&mut wizard);

    assert!(wizard.visible_fields().contains(&"companyName".to_string()));
    fill_about_you(&mut wizard);
    set(&mut wizard, "companyName", json!(""));

    let outcome = advance(&mut wizard);
    let messages = outcome.messages();
    assert_eq!(
        messages.keys().collect::<Vec<_>>(),
        vec!["companyName", "companySize"]
    );
    assert_eq!(
        messages["companyName"],
        "Company name is required for business accounts"
    );
    assert_eq!(wizard.current_step(), 2);
    assert_eq!(wizard.errors().len(), 2);

    set(&mut wizard, "companyName", json!("Acme"));
    assert!(!wizard.errors().contains_key("companyName"));
    set(&mut wizard, "companySize", json!("11-50"));
    assert_eq!(advance(&mut wizard), AdvanceOutcome::Advanced { step: 3 });
    assert_eq!(wizard.accumulated()["companyName"], json!("Acme"));
}

#[test]
fn errors_are_scoped_to_the_current_step() {
    let mut wizard = wizard();
    let outcome = advance(&mut wizard);

    let messages = outcome.messages();
    assert_eq!(messages.keys().collect::<Vec<_>>(), vec!["accountType"]);
    assert!(wizard.accumulated().is_empty());
}

#[test]
fn hidden_fields_never_block() {
    let mut spec = onboarding();
    spec.resets.clear();
    for field in spec.fields.iter_mut() {
        if field.id == "companyName" {
            field.required = true;
        }
    }
    let mut wizard = Wizard::new(spec).expect("wizard");

    set(&mut wizard, "accountType", json!("individual"));
    advance(&mut wizard);
    fill_about_you(&mut wizard);
    set(&mut wizard, "companySize", json!("not a size"));

    assert_eq!(advance(&mut wizard), AdvanceOutcome::Advanced { step: 3 });
    assert_eq!(wizard.accumulated()["companyName"], Value::Null);
    assert_eq!(wizard.accumulated()["companySize"], Value::Null);
}

#[test]
fn switching_to_individual_clears_company_details_immediately() {
    let mut wizard = wizard();
    set(&mut wizard, "accountType", json!("startup"));
    advance(&mut wizard);
    fill_about_you(&mut wizard);
    set(&mut wizard, "companyName", json!("Acme"));
    set(&mut wizard, "companySize", json!("1-10"));
    advance(&mut wizard);
    assert_eq!(wizard.accumulated()["companyName"], json!("Acme"));

    wizard.back();
    wizard.back();
    assert_eq!(wizard.current_step(), 1);
    set(&mut wizard, "accountType", json!("individual"));

    assert!(!wizard.values().contains_key("companyName"));
    assert!(!wizard.values().contains_key("companySize"));
    assert_eq!(wizard.accumulated()["companyName"], Value::Null);
    assert_eq!(wizard.accumulated()["companySize"], Value::Null);
    assert_eq!(wizard.accumulated()["fullName"], json!("John Doe"));
}

#[test]
fn app_fields_follow_the_help_selection() {
    let mut wizard = wizard();
    set(&mut wizard, "accountType", json!("individual"));
    advance(&mut wizard);
    fill_about_you(&mut wizard);
    advance(&mut wizard);

    set(&mut wizard, "help", json!(["automation"]));
    assert_eq!(wizard.visible_fields(), vec!["help"]);

    set(&mut wizard, "help", json!(["automation", "mobile app"]));
    assert_eq!(wizard.visible_fields(), vec!["help", "appName", "appStage"]);
    let outcome = advance(&mut wizard);
    assert_eq!(
        outcome.messages()["appName"],
        "App name is required when you need an app built"
    );

    set(&mut wizard, "appName", json!("Rocket"));
    set(&mut wizard, "help", json!(["consulting"]));
    assert!(!wizard.values().contains_key("appName"));
    assert_eq!(advance(&mut wizard), AdvanceOutcome::Advanced { step: 4 });
}

#[test]
fn back_is_floored_at_the_first_step() {
    let mut wizard = wizard();
    wizard.back();
    assert_eq!(wizard.current_step(), 1);
}

#[test]
fn back_keeps_entered_values() {
    let mut wizard = wizard();
    set(&mut wizard, "accountType", json!("agency/partner"));
    advance(&mut wizard);
    set(&mut wizard, "fullName", json!("Jane Roe"));

    wizard.back();
    assert_eq!(wizard.current_step(), 1);
    assert!(!wizard.accumulated().contains_key("fullName"));

    advance(&mut wizard);
    assert_eq!(wizard.values()["fullName"], json!("Jane Roe"));
}

#[test]
fn terminal_boundaries_are_usage_errors() {
    let mut wizard = wizard();
    assert_eq!(
        wizard.restart(),
        Err(UsageError::RestartBeforeTerminal { step: 1 })
    );
    assert_eq!(
        wizard.submission(),
        Err(UsageError::NotComplete { step: 1 })
    );

    let outcome = run_to_terminal(&mut wizard);
    assert!(matches!(outcome, AdvanceOutcome::Completed { .. }));
    assert!(wizard.is_terminal());
    assert_eq!(wizard.step_label(), Some("Thank you!"));

    assert_eq!(wizard.advance(), Err(UsageError::AdvanceFromTerminal));
    assert_eq!(
        wizard.set_value("budget", json!(1)),
        Err(UsageError::EditAtTerminal)
    );
}

#[test]
fn completion_hands_the_record_to_a_sink() {
    let mut wizard = wizard();
    let AdvanceOutcome::Completed { record } = run_to_terminal(&mut wizard) else {
        panic!("wizard did not complete");
    };
    assert_eq!(record["budget"], json!(1500));
    assert_eq!(record["accountType"], json!("individual"));
    assert_eq!(record["referralCode"], Value::Null);

    let submission = wizard.submission().expect("complete");
    let mut sink: Vec<Submission> = Vec::new();
    sink.submit(&submission).expect("in-memory sink");
    assert_eq!(sink[0].form_id, "saas-onboarding");
    assert_eq!(sink[0].answers, record);

    let bytes = submission.to_cbor().expect("cbor");
    assert_eq!(Submission::from_cbor(&bytes).expect("decode"), submission);
}

#[test]
fn restart_starts_a_fresh_session() {
    let mut wizard = wizard();
    run_to_terminal(&mut wizard);

    wizard.restart().expect("restart from terminal");
    assert_eq!(wizard.current_step(), 1);
    assert!(wizard.accumulated().is_empty());
    assert!(wizard.values().is_empty());
    assert!(wizard.errors().is_empty());
}

#[test]
fn edits_are_limited_to_the_current_step() {
    let mut wizard = wizard();
    assert_eq!(
        wizard.set_value("fullName", json!("John")),
        Err(UsageError::FieldNotOnStep {
            field: "fullName".into(),
            step: 1
        })
    );
    assert_eq!(
        wizard.clear_value("nickname"),
        Err(UsageError::UnknownField("nickname".into()))
    );
}

#[test]
fn touch_validates_a_single_field() {
    let mut wizard = wizard();
    set(&mut wizard, "accountType", json!("startup"));
    advance(&mut wizard);

    set(&mut wizard, "email", json!("nope"));
    let error = wizard.touch("email").expect("editable").expect("invalid");
    assert_eq!(error.message, "Please enter a valid email address");
    assert_eq!(wizard.errors().keys().collect::<Vec<_>>(), vec!["email"]);
    assert!(wizard.touched().contains("email"));

    set(&mut wizard, "email", json!("jane@example.org"));
    assert!(wizard.errors().is_empty());
    let error = wizard.touch("companyName").expect("editable").expect("required");
    assert_eq!(error.rule.as_deref(), Some("company-details"));
}

#[test]
fn dirty_fields_compare_against_the_accumulated_record() {
    let mut wizard = wizard();
    set(&mut wizard, "accountType", json!("individual"));
    advance(&mut wizard);
    fill_about_you(&mut wizard);
    assert_eq!(
        wizard.dirty_fields(),
        vec!["fullName", "email", "country", "timezone"]
    );

    advance(&mut wizard);
    wizard.back();
    assert!(wizard.dirty_fields().is_empty());

    set(&mut wizard, "email", json!("john@y.com"));
    assert_eq!(wizard.dirty_fields(), vec!["email"]);
}

#[test]
fn wizard_can_move_between_threads() {
    fn assert_send<T: Send>() {}
    assert_send::<Wizard>();
}

#[test]
fn clearing_a_trigger_clears_its_dependents() {
    let mut wizard = wizard();
    set(&mut wizard, "accountType", json!("startup"));
    advance(&mut wizard);
    fill_about_you(&mut wizard);
    set(&mut wizard, "companyName", json!("Acme"));
    set(&mut wizard, "companySize", json!("1-10"));
    advance(&mut wizard);

    wizard.back();
    wizard.back();
    wizard.clear_value("accountType").expect("editable");

    assert!(!wizard.values().contains_key("companyName"));
    assert_eq!(wizard.accumulated()["companyName"], Value::Null);
    assert_eq!(wizard.accumulated()["companySize"], Value::Null);
    assert!(!wizard.live_view().contains_key("accountType"));
}
