use dicat_diagnostics::{ErrorKind, ErrorMessageMode};
use pretty_assertions::assert_eq;

use super::fixtures::*;

#[test]
fn accessor_calls_are_checked_against_registered_contexts() {
    let mut index = file("/src/index.ts", Vec::new());
    index.container_calls = vec![
        container_call("get", Some("Net")),
        container_call("get", Some("Global")),
        container_call("get", Some("Nope")),
        container_call("getAll", Some("Net")),
        container_call("get", None),
    ];
    let model = model(vec![
        global(config("/src/global.diconfig.ts", vec![context("AppGlobal", None, Vec::new())])),
        config("/src/net.diconfig.ts", vec![context("Net", None, Vec::new())]),
        index,
    ]);
    let pipeline = run(&model);

    assert_eq!(
        kinds(&pipeline),
        vec![
            ErrorKind::GlobalContextAccess,
            ErrorKind::ContextNotFound,
            ErrorKind::InvalidAccessorMethod,
        ]
    );

    let report = pipeline.session().diagnostics().debug_report();
    assert_eq!(report.text_errors, vec!["You can't access Global Context"]);
    let messages: Vec<_> = report.errors.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "Context with name \"Nope\" not found",
            "Container has only following methods: get",
        ]
    );
    assert_eq!(report.errors[0].position, [4, 3]);
}

#[test]
fn human_message_lists_every_problem() {
    let mut index = file("/src/index.ts", Vec::new());
    index.container_calls = vec![container_call("get", Some("Nope"))];
    let pipeline = run(&model(vec![index]));

    let message = pipeline
        .error_message(ErrorMessageMode::Human)
        .unwrap()
        .unwrap();
    assert!(message.contains(" DI-CAT "), "{message}");
    assert!(
        message.contains("Context with name \"Nope\" not found\nAt: (/src/index.ts:4:3)\n"),
        "{message}"
    );
}
