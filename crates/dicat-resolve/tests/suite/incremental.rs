use std::path::Path;

use dicat_diagnostics::ErrorKind;
use dicat_model::SourceFile;
use dicat_resolve::Pipeline;
use pretty_assertions::assert_eq;

use super::fixtures::*;

fn global_file(members: Vec<dicat_model::ClassMember>) -> SourceFile {
    global(config(
        "/src/global.diconfig.ts",
        vec![context("AppGlobal", None, members)],
    ))
}

fn consumer() -> SourceFile {
    config(
        "/src/a.diconfig.ts",
        vec![context(
            "A",
            None,
            vec![method_bean("requester", "IRequester", vec![param("logger", "ILogger")])],
        )],
    )
}

#[test]
fn removing_a_provider_file_cascades() {
    let mut model = model(vec![
        global_file(vec![method_bean("logger", "ILogger", Vec::new())]),
        consumer(),
    ]);
    let mut pipeline = Pipeline::default();
    pipeline.run(&model).unwrap();
    assert!(pipeline.session().diagnostics().is_empty());

    let a = pipeline.session().contexts().by_name("A").unwrap().id;
    assert_eq!(pipeline.session().graph(a).unwrap().edge_count(), 1);

    let removed = pipeline.remove_path(Path::new("/src/global.diconfig.ts"));
    assert_eq!(removed.map(|c| c.is_global), Some(true));
    assert!(pipeline.session().contexts().global().is_none());
    assert!(!pipeline.session().is_resolved());
    // Edges into the removed context are gone before the next resolve.
    assert_eq!(pipeline.session().graph(a).unwrap().edge_count(), 0);

    model.remove(Path::new("/src/global.diconfig.ts"));
    pipeline.resolve_all(&model).unwrap();
    assert_eq!(kinds(&pipeline), vec![ErrorKind::UnresolvedDependency]);
}

#[test]
fn register_all_purges_files_that_left_the_model() {
    let mut model = model(vec![
        global_file(vec![method_bean("logger", "ILogger", Vec::new())]),
        consumer(),
    ]);
    let mut pipeline = Pipeline::default();
    pipeline.run(&model).unwrap();

    model.remove(Path::new("/src/global.diconfig.ts"));
    let summary = pipeline.register_all(&model).unwrap();
    assert_eq!(summary.removed, 1);
    assert_eq!(summary.contexts, 1);
    assert_eq!(pipeline.session().contexts().len(), 1);
}

#[test]
fn re_registering_a_changed_file_replaces_its_beans() {
    let mut model = model(vec![
        global_file(vec![method_bean("clock", "IClock", Vec::new())]),
        consumer(),
    ]);
    let mut pipeline = Pipeline::default();
    pipeline.run(&model).unwrap();
    assert_eq!(kinds(&pipeline), vec![ErrorKind::UnresolvedDependency]);

    model.insert(global_file(vec![
        method_bean("clock", "IClock", Vec::new()),
        method_bean("logger", "ILogger", Vec::new()),
    ]));
    let id = pipeline
        .register_path(&model, Path::new("/src/global.diconfig.ts"))
        .unwrap();
    assert_eq!(id, pipeline.session().contexts().global().map(|c| c.id));
    assert_eq!(pipeline.session().beans().len(), 3);

    pipeline.resolve_all(&model).unwrap();
    assert!(pipeline.session().diagnostics().is_empty());
}

#[test]
fn registration_errors_are_cleared_with_their_file() {
    let mut model = model(vec![config(
        "/src/app.diconfig.ts",
        vec![context(
            "App",
            None,
            vec![
                method_bean("first", "ILogger", Vec::new()),
                method_bean("second", "ILogger", Vec::new()),
            ],
        )],
    )]);
    let mut pipeline = Pipeline::default();
    pipeline.run(&model).unwrap();
    assert_eq!(kinds(&pipeline), vec![ErrorKind::AmbiguousBean]);

    model.insert(config(
        "/src/app.diconfig.ts",
        vec![context(
            "App",
            None,
            vec![method_bean("first", "ILogger", Vec::new())],
        )],
    ));
    pipeline.register_path(&model, Path::new("/src/app.diconfig.ts")).unwrap();
    assert!(pipeline.session().diagnostics().is_empty());
}

#[test]
fn resolving_twice_reports_the_same_diagnostics() {
    let model = model(vec![consumer()]);
    let mut pipeline = Pipeline::default();
    pipeline.run(&model).unwrap();
    let first: Vec<_> = pipeline.session().diagnostics().iter().cloned().collect();

    pipeline.resolve_all(&model).unwrap();
    let second: Vec<_> = pipeline.session().diagnostics().iter().cloned().collect();
    assert_eq!(first, second);
}

#[test]
fn duplicate_name_loser_registers_once_the_winner_is_gone() {
    let mut model = model(vec![
        config("/src/a.diconfig.ts", vec![context("A", Some("Shared"), Vec::new())]),
        config("/src/b.diconfig.ts", vec![context("B", Some("Shared"), Vec::new())]),
    ]);
    let mut pipeline = Pipeline::default();
    pipeline.run(&model).unwrap();
    assert_eq!(kinds(&pipeline), vec![ErrorKind::DuplicateContextName]);

    model.remove(Path::new("/src/a.diconfig.ts"));
    pipeline.run(&model).unwrap();
    assert!(pipeline.session().diagnostics().is_empty());
    assert_eq!(
        pipeline
            .session()
            .contexts()
            .by_name("Shared")
            .map(|c| c.class_name.to_string()),
        Some("B".to_string())
    );
}

#[test]
fn reset_starts_a_new_session() {
    let model = model(vec![consumer()]);
    let mut pipeline = Pipeline::default();
    pipeline.run(&model).unwrap();

    pipeline.reset();
    assert!(pipeline.session().contexts().is_empty());
    assert!(pipeline.session().beans().is_empty());
    assert!(pipeline.session().diagnostics().is_empty());
}

/// `(name, class, path, global)` of every context plus the diagnostics, which
/// is everything a clash decides.
fn registration_outcome(
    pipeline: &Pipeline,
) -> (
    Vec<(String, String, String, bool)>,
    Vec<dicat_diagnostics::CompilationError>,
) {
    let session = pipeline.session();
    let contexts = session
        .contexts()
        .iter()
        .map(|c| {
            (
                c.name.to_string(),
                c.class_name.to_string(),
                c.source_path.display().to_string(),
                c.is_global,
            )
        })
        .collect();
    (contexts, session.diagnostics().iter().cloned().collect())
}

fn assert_same_as_fresh_run(
    first: SourceFile,
    added: SourceFile,
) -> (Vec<(String, String, String, bool)>, Vec<ErrorKind>) {
    let mut incremental_model = model(vec![first.clone()]);
    let mut incremental = Pipeline::default();
    incremental.run(&incremental_model).unwrap();
    incremental_model.insert(added.clone());
    incremental.run(&incremental_model).unwrap();

    let fresh = run(&model(vec![first, added]));
    assert_eq!(registration_outcome(&incremental), registration_outcome(&fresh));

    let (contexts, _) = registration_outcome(&fresh);
    (contexts, kinds(&fresh))
}

#[test]
fn duplicate_name_winner_does_not_depend_on_earlier_runs() {
    let (contexts, kinds) = assert_same_as_fresh_run(
        config("/src/b.diconfig.ts", vec![context("B", Some("Shared"), Vec::new())]),
        config("/src/0.diconfig.ts", vec![context("Zero", Some("Shared"), Vec::new())]),
    );

    assert_eq!(
        contexts,
        vec![(
            "Shared".to_string(),
            "Zero".to_string(),
            "/src/0.diconfig.ts".to_string(),
            false
        )]
    );
    assert_eq!(kinds, vec![ErrorKind::DuplicateContextName]);
}

#[test]
fn global_context_winner_does_not_depend_on_earlier_runs() {
    let (contexts, kinds) = assert_same_as_fresh_run(
        global(config("/src/b.diconfig.ts", vec![context("B", None, Vec::new())])),
        global(config("/src/0.diconfig.ts", vec![context("Zero", None, Vec::new())])),
    );

    assert_eq!(
        contexts,
        vec![(
            "Global".to_string(),
            "Zero".to_string(),
            "/src/0.diconfig.ts".to_string(),
            true
        )]
    );
    assert_eq!(kinds, vec![ErrorKind::DuplicateGlobalContext]);
}
