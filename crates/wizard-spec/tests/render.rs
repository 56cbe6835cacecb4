use serde_json::json;

use wizard_spec::{
    FormSpec, StepStatus, Wizard, build_step_view, render_json_ui, render_text,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "onboarding" => include_str!("../tests/fixtures/onboarding.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn wizard() -> Wizard {
    let spec: FormSpec = serde_json::from_str(fixture("onboarding")).expect("deserialize");
    Wizard::new(spec).expect("wizard")
}

#[test]
fn render_text_lists_visible_fields() {
    let mut wizard = wizard();
    wizard
        .set_value("accountType", json!("individual"))
        .expect("editable");
    wizard.advance().expect("advance");

    let view = build_step_view(&wizard);
    assert_eq!(view.status, StepStatus::NeedInput);
    assert_eq!(view.step, 2);
    assert_eq!(view.content_steps, 4);

    let text = render_text(&view);
    assert!(text.contains("Step 2/4: About you"));
    assert!(text.contains(" - fullName (Full name) [required]"));
    assert!(!text.contains("companyName"));
}

#[test]
fn render_json_ui_exposes_errors_and_schema() {
    let mut wizard = wizard();
    wizard.advance().expect("advance");

    let ui = render_json_ui(&build_step_view(&wizard));
    assert_eq!(ui["form_id"], "saas-onboarding");
    assert_eq!(ui["status"], "invalid");
    assert_eq!(ui["fields"][0]["id"], "accountType");
    assert_eq!(
        ui["fields"][0]["error"],
        "invalid option, Please select a valid one!"
    );
    assert_eq!(ui["schema"]["required"][0], "accountType");
}

#[test]
fn completion_view_shows_thank_you_copy() {
    let mut wizard = wizard();
    for (field, value) in [
        ("accountType", json!("individual")),
        ("fullName", json!("John Doe")),
        ("email", json!("john@x.com")),
        ("country", json!("France")),
        ("timezone", json!("Europe/Paris")),
        ("help", json!(["consulting"])),
        ("budget", json!(900)),
    ] {
        if wizard.steps().owner_of(field) != Some(wizard.current_step()) {
            wizard.advance().expect("advance");
        }
        wizard.set_value(field, value).expect("editable");
    }
    wizard.advance().expect("advance");

    let view = build_step_view(&wizard);
    assert_eq!(view.status, StepStatus::Complete);
    let text = render_text(&view);
    assert!(text.contains("Thank you!"));
    assert!(text.contains("We'll be in touch shortly."));
}

#[test]
fn rule_required_fields_are_marked_required() {
    let mut wizard = wizard();
    wizard
        .set_value("accountType", json!("startup"))
        .expect("editable");
    wizard.advance().expect("advance");

    let text = render_text(&build_step_view(&wizard));
    assert!(text.contains(" - companyName (Company name) [required]"));
    assert!(text.contains(" - companySize (Company size) [required]"));

    let ui = render_json_ui(&build_step_view(&wizard));
    let fields = ui["fields"].as_array().expect("fields");
    let company_name = fields
        .iter()
        .find(|field| field["id"] == "companyName")
        .expect("companyName");
    assert_eq!(company_name["required"], true);
}
