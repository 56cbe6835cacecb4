//! Property tests: accumulated values survive forward navigation and
//! validation never reports fields outside the current step.

use std::collections::BTreeSet;

use proptest::prelude::*;
use serde_json::json;

use wizard_spec::{AdvanceOutcome, FormSpec, UsageError, Wizard};

const ACCOUNTS: [&str; 4] = ["individual", "startup", "established business", "agency/partner"];

fn onboarding() -> FormSpec {
    serde_json::from_str(include_str!("../tests/fixtures/onboarding.json")).expect("deserialize")
}

#[derive(Debug, Clone)]
enum Op {
    Advance,
    Back,
    Fill {
        account: usize,
        short_name: bool,
        apps: bool,
    },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Advance),
        1 => Just(Op::Back),
        3 => (0usize..ACCOUNTS.len(), any::<bool>(), any::<bool>()).prop_map(
            |(account, short_name, apps)| Op::Fill {
                account,
                short_name,
                apps,
            }
        ),
    ]
}

/// Fills the current step with values; `short_name` makes step 2 invalid.
fn fill(wizard: &mut Wizard, account: usize, short_name: bool, apps: bool) {
    let edits = match wizard.current_step() {
        1 => vec![("accountType", json!(ACCOUNTS[account]))],
        2 => vec![
            ("fullName", json!(if short_name { "Jo" } else { "John Doe" })),
            ("email", json!("john@x.com")),
            ("country", json!("France")),
            ("timezone", json!("Europe/Paris")),
            ("companyName", json!("Acme")),
            ("companySize", json!("1-10")),
        ],
        3 if apps => vec![
            ("help", json!(["web app"])),
            ("appName", json!("Rocket")),
            ("appStage", json!("idea")),
        ],
        3 => vec![("help", json!(["automation"]))],
        4 => vec![("budget", json!(1500))],
        _ => Vec::new(),
    };
    for (field, value) in edits {
        wizard.set_value(field, value).expect("field belongs to the step");
    }
}

proptest! {
    #[test]
    fn accumulated_values_survive_advances(ops in prop::collection::vec(arb_op(), 1..40)) {
        let spec = onboarding();
        let dependents: BTreeSet<String> = spec
            .resets
            .iter()
            .flat_map(|rule| rule.dependents.iter().cloned())
            .collect();
        let mut wizard = Wizard::new(spec).expect("wizard");

        for op in ops {
            match op {
                Op::Back => wizard.back(),
                Op::Fill { account, short_name, apps } => {
                    if !wizard.is_terminal() {
                        fill(&mut wizard, account, short_name, apps);
                    }
                }
                Op::Advance => {
                    let step = wizard.current_step();
                    let before = wizard.accumulated().clone();

                    match wizard.advance() {
                        Err(err) => {
                            prop_assert_eq!(err, UsageError::AdvanceFromTerminal);
                            prop_assert!(wizard.restart().is_ok());
                        }
                        Ok(AdvanceOutcome::Blocked { errors }) => {
                            prop_assert_eq!(wizard.current_step(), step);
                            prop_assert_eq!(wizard.accumulated(), &before);
                            for field in errors.keys() {
                                prop_assert_eq!(wizard.steps().owner_of(field), Some(step));
                            }
                        }
                        Ok(_) => {
                            prop_assert_eq!(wizard.current_step(), step + 1);
                            let after = wizard.accumulated();
                            for (field, value) in &before {
                                if wizard.steps().owner_of(field) == Some(step)
                                    || dependents.contains(field)
                                {
                                    continue;
                                }
                                prop_assert_eq!(after.get(field), Some(value));
                            }
                            for field in wizard.steps().fields(step) {
                                prop_assert!(after.contains_key(field));
                            }
                        }
                    }
                }
            }
        }
    }
}
