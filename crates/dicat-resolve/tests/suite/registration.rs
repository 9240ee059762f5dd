use std::path::Path;

use dicat_config::ContextsConfig;
use dicat_diagnostics::{ErrorKind, Phase};
use dicat_resolve::{Pipeline, Qualifier, Scope, GLOBAL_CONTEXT_NAME};
use pretty_assertions::assert_eq;

use super::fixtures::*;

#[test]
fn contexts_are_named_by_argument_or_class() {
    let model = model(vec![
        config(
            "/src/logging.diconfig.ts",
            vec![context("LoggingConfig", Some("Logging"), Vec::new())],
        ),
        config("/src/net.diconfig.ts", vec![context("Net", None, Vec::new())]),
        global(config(
            "/src/global.diconfig.ts",
            vec![context("AppGlobal", Some("Ignored"), Vec::new())],
        )),
    ]);
    let pipeline = run(&model);
    let contexts = pipeline.session().contexts();

    let names: Vec<_> = contexts.iter().map(|c| c.name.to_string()).collect();
    assert_eq!(names, vec![GLOBAL_CONTEXT_NAME, "Logging", "Net"]);
    assert_eq!(
        contexts.global().map(|c| c.source_path.as_path()),
        Some(Path::new("/src/global.diconfig.ts"))
    );
    assert!(pipeline.session().diagnostics().is_empty());
}

#[test]
fn second_global_context_is_reported_and_skipped() {
    let model = model(vec![
        global(config("/src/a.diconfig.ts", vec![context("A", None, Vec::new())])),
        global(config("/src/b.diconfig.ts", vec![context("B", None, Vec::new())])),
    ]);
    let pipeline = run(&model);

    let errors = errors_of(&pipeline, ErrorKind::DuplicateGlobalContext);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].scope, Path::new("/src/b.diconfig.ts"));
    assert_eq!(errors[0].phase, Phase::Registration);
    assert_eq!(
        errors[0].related_context.as_ref().map(|loc| loc.file.as_path()),
        Some(Path::new("/src/a.diconfig.ts"))
    );
    assert_eq!(pipeline.session().contexts().len(), 1);
}

#[test]
fn duplicate_context_names_keep_the_first_path() {
    let model = model(vec![
        config("/src/a.diconfig.ts", vec![context("A", Some("Shared"), Vec::new())]),
        config("/src/b.diconfig.ts", vec![context("B", Some("Shared"), Vec::new())]),
    ]);
    let pipeline = run(&model);

    assert_eq!(kinds(&pipeline), vec![ErrorKind::DuplicateContextName]);
    let errors = errors_of(&pipeline, ErrorKind::DuplicateContextName);
    assert_eq!(errors[0].nodes.len(), 2);
    assert_eq!(
        pipeline
            .session()
            .contexts()
            .by_name("Shared")
            .map(|c| c.class_name.to_string()),
        Some("A".to_string())
    );
}

#[test]
fn only_the_first_context_of_a_file_counts() {
    let model = model(vec![config(
        "/src/app.diconfig.ts",
        vec![
            context("First", None, Vec::new()),
            context("Second", None, Vec::new()),
        ],
    )]);
    let pipeline = run(&model);

    assert_eq!(kinds(&pipeline), vec![ErrorKind::MultipleContextsInFile]);
    let names: Vec<_> = pipeline
        .session()
        .contexts()
        .iter()
        .map(|c| c.name.to_string())
        .collect();
    assert_eq!(names, vec!["First"]);
}

#[test]
fn filter_limits_context_discovery() {
    let model = model(vec![
        config("/src/app.diconfig.ts", vec![context("App", None, Vec::new())]),
        config("/src/app.ts", vec![context("NotConfig", None, Vec::new())]),
    ]);
    let filter = ContextsConfig {
        include: vec!["**/*.diconfig.ts".to_string()],
        exclude: Vec::new(),
    }
    .filter()
    .unwrap();

    let mut pipeline = Pipeline::new(filter);
    pipeline.run(&model).unwrap();

    let names: Vec<_> = pipeline
        .session()
        .contexts()
        .iter()
        .map(|c| c.name.to_string())
        .collect();
    assert_eq!(names, vec!["App"]);
}

#[test]
fn beans_with_different_qualifiers_coexist() {
    let model = model(vec![config(
        "/src/logging.diconfig.ts",
        vec![context(
            "Logging",
            None,
            vec![
                qualified_method_bean(
                    "consoleLogger",
                    "ILogger",
                    Some("consoleLogger"),
                    Vec::new(),
                ),
                method_bean("logger2", "ILogger", Vec::new()),
            ],
        )],
    )]);
    let pipeline = run(&model);
    assert!(pipeline.session().diagnostics().is_empty());

    let session = pipeline.session();
    let logging = session.contexts().by_name("Logging").unwrap();
    let beans = session.beans().beans(logging.id);
    let qualifiers: Vec<_> = beans.iter().map(|bean| bean.qualifier.clone()).collect();
    assert_eq!(
        qualifiers,
        vec![Qualifier::Named("consoleLogger".into()), Qualifier::Default]
    );
    assert_eq!(beans[0].identity, beans[1].identity);
    assert!(beans.iter().all(|bean| bean.scope == Scope::Singleton));
}

#[test]
fn same_identity_and_qualifier_is_one_ambiguous_bean_error() {
    let model = model(vec![config(
        "/src/logging.diconfig.ts",
        vec![context(
            "Logging",
            None,
            vec![
                method_bean("first", "ILogger", Vec::new()),
                method_bean("second", "ILogger", Vec::new()),
            ],
        )],
    )]);
    let pipeline = run(&model);

    let errors = errors_of(&pipeline, ErrorKind::AmbiguousBean);
    assert_eq!(errors.len(), 1);
    let lines: Vec<_> = errors[0].nodes.iter().map(|loc| loc.range.start.line).collect();
    assert_eq!(lines, vec![1, 2]);
}

#[test]
fn aliased_bean_types_share_an_identity() {
    let mut logging = config(
        "/src/logging.diconfig.ts",
        vec![context(
            "Logging",
            None,
            vec![
                method_bean("direct", "ILogger", Vec::new()),
                method_bean("aliased", "Log", Vec::new()),
            ],
        )],
    );
    logging.imports.push(dicat_model::Import::Named {
        local: "Log".into(),
        imported: "ILogger".into(),
        from: "/src/types.ts".into(),
    });
    let pipeline = run(&model(vec![logging]));

    assert_eq!(kinds(&pipeline), vec![ErrorKind::AmbiguousBean]);
}

#[test]
fn field_bean_with_matching_explicit_types_registers() {
    let model = model(vec![
        config(
            "/src/net.diconfig.ts",
            vec![
                class("Requester", "request", Vec::new()),
                context(
                    "Net",
                    None,
                    vec![field_bean(
                        "requester",
                        "Requester",
                        Some("IRequester"),
                        Some("IRequester"),
                    )],
                ),
            ],
        ),
    ]);
    let pipeline = run(&model);
    assert!(pipeline.session().diagnostics().is_empty());

    let session = pipeline.session();
    let net = session.contexts().by_name("Net").unwrap();
    let bean = &session.beans().beans(net.id)[0];
    assert_eq!(bean.member_name, "requester");
    assert_eq!(bean.type_name, "IRequester");
}

#[test]
fn field_bean_with_different_explicit_types_is_a_mismatch() {
    let model = model(vec![config(
        "/src/net.diconfig.ts",
        vec![
            class("Requester", "request", Vec::new()),
            context(
                "Net",
                None,
                vec![field_bean("requester", "Requester", Some("IRequester"), Some("ILogger"))],
            ),
        ],
    )]);
    let pipeline = run(&model);

    assert_eq!(kinds(&pipeline), vec![ErrorKind::ExplicitTypeMismatch]);
    let net = pipeline.session().contexts().by_name("Net").unwrap();
    assert!(pipeline.session().beans().beans(net.id).is_empty());
}

#[test]
fn field_bean_type_falls_back_to_the_constructor() {
    let model = model(vec![config(
        "/src/net.diconfig.ts",
        vec![
            class("Requester", "request", Vec::new()),
            context(
                "Net",
                None,
                vec![
                    field_bean("requester", "Requester", None, None),
                    field_bean("broken", "Missing", None, None),
                ],
            ),
        ],
    )]);
    let pipeline = run(&model);

    let errors = errors_of(&pipeline, ErrorKind::CannotQualifyBean);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "Can't qualify type of Bean, please specify type explicitly"
    );

    let session = pipeline.session();
    let net = session.contexts().by_name("Net").unwrap();
    let beans: Vec<_> = session
        .beans()
        .beans(net.id)
        .iter()
        .map(|bean| bean.member_name.to_string())
        .collect();
    assert_eq!(beans, vec!["requester"]);
}

#[test]
fn registering_twice_is_idempotent() {
    let model = model(vec![config(
        "/src/net.diconfig.ts",
        vec![
            class("Requester", "request", vec![param("logger", "ILogger")]),
            context(
                "Net",
                None,
                vec![
                    method_bean("logger", "ILogger", Vec::new()),
                    field_bean("requester", "Requester", Some("IRequester"), None),
                    method_bean("clock", "IClock", vec![param("logger", "ILogger")]),
                ],
            ),
        ],
    )]);

    let snapshot = |pipeline: &Pipeline| {
        let session = pipeline.session();
        let net = session.contexts().by_name("Net").unwrap().clone();
        let beans = session.beans().beans(net.id).to_vec();
        let dependencies: Vec<_> = beans
            .iter()
            .map(|bean| session.dependencies().dependencies(bean.id).to_vec())
            .collect();
        let diagnostics: Vec<_> = session.diagnostics().iter().cloned().collect();
        (net, beans, dependencies, diagnostics)
    };

    let mut pipeline = Pipeline::default();
    pipeline.run(&model).unwrap();
    let first = snapshot(&pipeline);

    pipeline.run(&model).unwrap();
    let second = snapshot(&pipeline);
    assert_eq!(first, second);

    let (_, beans, dependencies, _) = first;
    assert_eq!(beans.len(), 3);
    assert_eq!(
        dependencies.iter().map(Vec::len).collect::<Vec<_>>(),
        vec![0, 1, 1]
    );
}
