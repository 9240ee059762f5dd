use dicat_resolve::{BeanAccessor, BeanConstruction, Pipeline, Scope};
use pretty_assertions::assert_eq;

use super::fixtures::*;

fn app_model() -> dicat_model::MemorySourceModel {
    model(vec![
        global(config(
            "/src/global.diconfig.ts",
            vec![context("AppGlobal", None, vec![method_bean("logger", "ILogger", Vec::new())])],
        )),
        config(
            "/src/net.diconfig.ts",
            vec![
                class("Requester", "request", vec![param("clock", "IClock")]),
                context(
                    "Net",
                    None,
                    vec![
                        prototype(method_bean("clock", "IClock", vec![param("logger", "ILogger")])),
                        field_bean("requester", "Requester", Some("IRequester"), None),
                    ],
                ),
            ],
        ),
    ])
}

#[test]
fn plans_describe_construction_and_accessors() {
    let pipeline = run(&app_model());
    let plans = pipeline.plans().unwrap().expect("no diagnostics");

    let names: Vec<_> = plans.iter().map(|plan| plan.name.to_string()).collect();
    assert_eq!(names, vec!["Global", "Net"]);

    let net = &plans[1];
    assert!(!net.is_global);
    assert_eq!(net.class_name, "Net");

    let clock = &net.beans[0];
    assert_eq!(clock.scope, Scope::Prototype);
    assert_eq!(clock.construction, BeanConstruction::Method);
    assert_eq!(
        clock.args,
        vec![BeanAccessor::Global {
            context: "Global".into(),
            member: "logger".into(),
        }]
    );

    let requester = &net.beans[1];
    assert_eq!(
        requester.construction,
        BeanConstruction::Constructor {
            class: "Requester".into()
        }
    );
    assert_eq!(
        requester.args,
        vec![BeanAccessor::Local {
            member: "clock".into()
        }]
    );
}

#[test]
fn plans_serialize_for_codegen() {
    let pipeline = run(&app_model());
    let plans = pipeline.plans().unwrap().unwrap();
    let json = serde_json::to_value(&plans[1].beans[1]).unwrap();

    assert_eq!(
        json,
        serde_json::json!({
            "member": "requester",
            "scope": "singleton",
            "qualifier": "default",
            "construction": { "kind": "constructor", "class": "Requester" },
            "args": [{ "kind": "local", "member": "clock" }],
        })
    );
}

#[test]
fn no_plans_while_errors_exist() {
    let model = model(vec![config(
        "/src/net.diconfig.ts",
        vec![context(
            "Net",
            None,
            vec![method_bean("requester", "IRequester", vec![param("logger", "ILogger")])],
        )],
    )]);
    let pipeline = run(&model);

    assert_eq!(pipeline.plans().unwrap(), None);
}

#[test]
fn no_plans_before_resolution() {
    let mut pipeline = Pipeline::default();
    pipeline.register_all(&app_model()).unwrap();

    assert_eq!(pipeline.plans().unwrap(), None);
}
