use dicat_diagnostics::ErrorKind;
use pretty_assertions::assert_eq;

use super::fixtures::*;

#[test]
fn two_bean_cycle_is_reported_exactly_once() {
    let model = model(vec![config(
        "/src/app.diconfig.ts",
        vec![context(
            "App",
            None,
            vec![
                method_bean("logger", "ILogger", vec![param("clock", "IClock")]),
                method_bean("clock", "IClock", vec![param("logger", "ILogger")]),
            ],
        )],
    )]);
    let pipeline = run(&model);

    let errors = errors_of(&pipeline, ErrorKind::CyclicDependency);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "Cyclic dependency detected: logger -> clock -> logger"
    );
    assert_eq!(errors[0].nodes.len(), 2);
    assert_eq!(pipeline.session().cycles().len(), 1);
}

#[test]
fn cycle_in_the_global_context_is_reported_once_for_all_consumers() {
    let model = model(vec![
        global(config(
            "/src/global.diconfig.ts",
            vec![context(
                "AppGlobal",
                None,
                vec![
                    method_bean("logger", "ILogger", vec![param("clock", "IClock")]),
                    method_bean("clock", "IClock", vec![param("logger", "ILogger")]),
                ],
            )],
        )),
        config(
            "/src/a.diconfig.ts",
            vec![context(
                "A",
                None,
                vec![method_bean("requester", "IRequester", vec![param("logger", "ILogger")])],
            )],
        ),
        config(
            "/src/b.diconfig.ts",
            vec![context(
                "B",
                None,
                vec![method_bean("metrics", "IMetrics", vec![param("clock", "IClock")])],
            )],
        ),
    ]);
    let pipeline = run(&model);

    assert_eq!(kinds(&pipeline), vec![ErrorKind::CyclicDependency]);
}

#[test]
fn prototype_beans_are_not_exempt() {
    let model = model(vec![config(
        "/src/app.diconfig.ts",
        vec![context(
            "App",
            None,
            vec![
                prototype(method_bean("logger", "ILogger", vec![param("clock", "IClock")])),
                prototype(method_bean("clock", "IClock", vec![param("metrics", "IMetrics")])),
                method_bean("metrics", "IMetrics", vec![param("logger", "ILogger")]),
            ],
        )],
    )]);
    let pipeline = run(&model);

    let errors = errors_of(&pipeline, ErrorKind::CyclicDependency);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "Cyclic dependency detected: logger -> clock -> metrics -> logger"
    );
}

#[test]
fn diamond_is_not_a_cycle() {
    let model = model(vec![config(
        "/src/app.diconfig.ts",
        vec![context(
            "App",
            None,
            vec![
                method_bean("logger", "ILogger", Vec::new()),
                method_bean("clock", "IClock", vec![param("logger", "ILogger")]),
                method_bean("metrics", "IMetrics", vec![param("logger", "ILogger")]),
                method_bean(
                    "requester",
                    "IRequester",
                    vec![param("clock", "IClock"), param("metrics", "IMetrics")],
                ),
            ],
        )],
    )]);
    let pipeline = run(&model);

    assert!(pipeline.session().diagnostics().is_empty());
    assert!(pipeline.session().cycles().is_empty());
}
