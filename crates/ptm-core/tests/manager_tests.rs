//! ProjectManager Tests
//!
//! Reads, structural operations and error mapping against an in-memory
//! workspace.
//!
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use ptm_core::prelude::*;
use ptm_core::{ErrorKind, ReadOnlyPolicy};
use ptm_model::{EntryKind, ValueOrigin};
use ptm_registry::ProjectHandlerRegistry;
use ptm_test_utils::{demo_registry, init_tracing, p, seeded_fs, ws, FailPoint, FlakyFileSystem};
use ptm_vfs::{MemoryFileSystem, VfsRegistry, VirtualFileSystem};
use std::sync::Arc;

fn manager_over(fs: Arc<dyn VirtualFileSystem>) -> ProjectManager {
    init_tracing();
    let vfs = Arc::new(VfsRegistry::new());
    vfs.register(ws(), fs);
    ProjectManager::new(vfs, demo_registry(), Arc::new(ProjectHandlerRegistry::new()))
}

fn seeded_manager() -> ProjectManager {
    manager_over(Arc::new(seeded_fs()))
}

fn create(manager: &ProjectManager, name: &str, config: ProjectConfig) -> Project {
    manager
        .create_project(&ws(), name, config, &CreateOptions::new(), Visibility::Public)
        .unwrap()
        .into_value()
}

#[test]
fn test_create_then_get_returns_same_config() {
    let manager = seeded_manager();
    let config = ProjectConfig::new("blank")
        .with_mixin("git")
        .with_attribute("owner", ["team-a"])
        .with_description("demo project");

    let created = create(&manager, "demo", config.clone());
    assert_eq!(created.path(), &p("/demo"));

    let found = manager.get_project(&ws(), &p("/demo")).unwrap().unwrap();
    assert_eq!(found.config(), &config);
    assert_eq!(found.visibility(), Visibility::Public);
    assert!(found.misc().creation_date().is_some());
}

#[test]
fn test_get_projects_lists_only_top_level_projects() {
    let manager = seeded_manager();
    create(&manager, "b", ProjectConfig::new("blank"));
    create(&manager, "a", ProjectConfig::new("blank"));

    let names: Vec<_> = manager
        .get_projects(&ws())
        .unwrap()
        .iter()
        .map(|project| project.name().to_string())
        .collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn test_get_projects_sorted_whatever_the_backend_order() {
    let fs = Arc::new(FlakyFileSystem::new(Arc::new(MemoryFileSystem::new())));
    let manager = manager_over(fs.clone());
    for name in ["b", "c", "a"] {
        create(&manager, name, ProjectConfig::new("blank"));
    }
    fs.reverse_listings();

    let names: Vec<_> = manager
        .get_projects(&ws())
        .unwrap()
        .iter()
        .map(|project| project.name().to_string())
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn test_get_entry_distinguishes_kinds() {
    let manager = seeded_manager();
    create(&manager, "demo", ProjectConfig::new("blank"));

    let kind = |path: &str| manager.get_entry(&ws(), &p(path)).unwrap().map(|e| e.kind());
    assert_eq!(kind("/demo"), Some(EntryKind::Project));
    assert_eq!(kind("/sources"), Some(EntryKind::Folder));
    assert_eq!(kind("/notes/readme.txt"), Some(EntryKind::File));
    assert_eq!(kind("/missing"), None);
    assert!(manager.get_project(&ws(), &p("/sources")).unwrap().is_none());
}

#[test]
fn test_projects_root_and_unknown_workspace() {
    let manager = seeded_manager();
    assert!(manager.get_projects_root(&ws()).unwrap().is_root());

    let err = manager.get_projects(&WorkspaceId::new("nope")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_list_children() {
    let manager = seeded_manager();
    let children = manager.list_children(&ws(), &p("/sources/demo")).unwrap();
    let paths: Vec<_> = children.iter().map(|e| e.path().to_string()).collect();
    assert_eq!(paths, vec!["/sources/demo/pom.xml", "/sources/demo/src"]);

    let err = manager.list_children(&ws(), &p("/missing")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_create_on_existing_path_conflicts() {
    let manager = seeded_manager();
    let err = manager
        .create_project(
            &ws(),
            "sources",
            ProjectConfig::new("blank"),
            &CreateOptions::new(),
            Visibility::Public,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn test_lenient_create_adopts_existing_folder() {
    let manager = seeded_manager().with_config(ManagerConfig::new().with_strict_create(false));
    create(&manager, "notes", ProjectConfig::new("blank"));

    assert!(manager.get_project(&ws(), &p("/notes")).unwrap().is_some());
    let children = manager.list_children(&ws(), &p("/notes")).unwrap();
    assert_eq!(children.len(), 1);
}

#[test]
fn test_invalid_config_is_rejected_before_storage() {
    let fs = Arc::new(FlakyFileSystem::new(Arc::new(MemoryFileSystem::new())));
    let manager = manager_over(fs.clone());

    for config in [
        ProjectConfig::new("docs"),
        ProjectConfig::new("nope"),
        ProjectConfig::new("git"),
        ProjectConfig::new("blank").with_mixin("maven"),
        ProjectConfig::new("java").with_attribute("language", ["kotlin"]),
    ] {
        let err = manager
            .create_project(&ws(), "x", config.clone(), &CreateOptions::new(), Visibility::Public)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProjectTypeConstraint, "{config:?}");
    }
    assert_eq!(fs.mutations(), 0);

    create(
        &manager,
        "x",
        ProjectConfig::new("docs").with_attribute("generator", ["mdbook"]),
    );
}

#[test]
fn test_update_keeps_visibility_when_omitted() {
    let manager = seeded_manager();
    manager
        .create_project(
            &ws(),
            "demo",
            ProjectConfig::new("blank"),
            &CreateOptions::new(),
            Visibility::Private,
        )
        .unwrap();

    let updated = manager
        .update_project(
            &ws(),
            &p("/demo"),
            ProjectConfig::new("blank").with_mixin("git"),
            None,
        )
        .unwrap()
        .into_value();
    assert_eq!(updated.visibility(), Visibility::Private);
    assert!(updated.misc().modification_date().is_some());

    let stored = manager.get_project(&ws(), &p("/demo")).unwrap().unwrap();
    assert!(stored.config().mixins.contains("git"));
    assert_eq!(stored.misc().creation_date(), updated.misc().creation_date());
}

#[test]
fn test_update_plain_folder_is_not_found() {
    let manager = seeded_manager();
    let err = manager
        .update_project(&ws(), &p("/sources"), ProjectConfig::new("blank"), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_misc_save_and_get() {
    let manager = seeded_manager();
    create(&manager, "demo", ProjectConfig::new("blank"));

    let mut misc = manager.get_project_misc(&ws(), &p("/demo")).unwrap();
    misc.set("lastBuild", "ok");
    manager.save_project_misc(&ws(), &p("/demo"), &misc).unwrap();

    let stored = manager.get_project_misc(&ws(), &p("/demo")).unwrap();
    assert_eq!(stored.get("lastBuild"), Some("ok"));
    assert_eq!(stored, misc);

    let err = manager
        .save_project_misc(&ws(), &p("/sources"), &misc)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_add_module_relative_and_absolute() {
    let manager = seeded_manager();
    create(&manager, "app", ProjectConfig::new("blank"));

    manager
        .add_module(
            &ws(),
            &p("/app"),
            "libs/core",
            ProjectConfig::new("blank"),
            &CreateOptions::new(),
            Visibility::Public,
        )
        .unwrap();
    manager
        .add_module(
            &ws(),
            &p("/app"),
            "/app/web",
            ProjectConfig::new("blank"),
            &CreateOptions::new(),
            Visibility::Public,
        )
        .unwrap();

    let modules: Vec<_> = manager
        .get_project_modules(&ws(), &p("/app"))
        .unwrap()
        .iter()
        .map(|m| m.path().to_string())
        .collect();
    assert_eq!(modules, vec!["/app/libs/core", "/app/web"]);
    assert_eq!(
        manager.get_entry(&ws(), &p("/app/libs")).unwrap().map(|e| e.kind()),
        Some(EntryKind::Folder)
    );
}

#[test]
fn test_add_module_outside_project_mutates_nothing() {
    let fs = Arc::new(FlakyFileSystem::new(Arc::new(seeded_fs())));
    let manager = manager_over(fs.clone());
    create(&manager, "app", ProjectConfig::new("blank"));
    let before = fs.mutations();

    for module in ["/other/x", "/app", "../other", "libs/../../x"] {
        let err = manager
            .add_module(
                &ws(),
                &p("/app"),
                module,
                ProjectConfig::new("blank"),
                &CreateOptions::new(),
                Visibility::Public,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProjectTypeConstraint, "{module}");
    }
    assert_eq!(fs.mutations(), before);
    assert!(manager.get_entry(&ws(), &p("/other")).unwrap().is_none());
}

#[test]
fn test_add_module_depth_limit() {
    let manager = seeded_manager().with_config(ManagerConfig::new().with_max_module_depth(2));
    create(&manager, "app", ProjectConfig::new("blank"));

    let err = manager
        .add_module(
            &ws(),
            &p("/app"),
            "a/b/c",
            ProjectConfig::new("blank"),
            &CreateOptions::new(),
            Visibility::Public,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProjectTypeConstraint);
}

#[test]
fn test_add_module_needs_parent_project() {
    let manager = seeded_manager();
    let err = manager
        .add_module(
            &ws(),
            &p("/sources"),
            "demo",
            ProjectConfig::new("blank"),
            &CreateOptions::new(),
            Visibility::Public,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_convert_folder_keeps_content() {
    let manager = seeded_manager();
    let project = manager
        .convert_folder_to_project(
            &ws(),
            &p("/sources/demo"),
            ProjectConfig::new("maven"),
            Visibility::Public,
        )
        .unwrap()
        .into_value();
    assert_eq!(project.project_type(), "maven");
    assert_eq!(
        manager.list_children(&ws(), &p("/sources/demo")).unwrap().len(),
        2
    );

    let again = manager
        .convert_folder_to_project(
            &ws(),
            &p("/sources/demo"),
            ProjectConfig::new("blank"),
            Visibility::Public,
        )
        .unwrap_err();
    assert_eq!(again.kind(), ErrorKind::Conflict);
}

#[test]
fn test_convert_rejects_root_missing_and_files() {
    let manager = seeded_manager();
    let convert = |path: &str| {
        manager
            .convert_folder_to_project(&ws(), &p(path), ProjectConfig::new("blank"), Visibility::Public)
            .unwrap_err()
            .kind()
    };
    assert_eq!(convert("/"), ErrorKind::Forbidden);
    assert_eq!(convert("/missing"), ErrorKind::NotFound);
    assert_eq!(convert("/notes/readme.txt"), ErrorKind::Conflict);
}

#[test]
fn test_rename_project_keeps_config() {
    let manager = seeded_manager();
    let config = ProjectConfig::new("blank").with_attribute("owner", ["me"]);
    create(&manager, "old", config.clone());

    let renamed = manager
        .rename(&ws(), &p("/old"), "new", None)
        .unwrap()
        .into_value()
        .unwrap();
    assert_eq!(renamed.path(), &p("/new"));
    assert_eq!(renamed.as_project().unwrap().config(), &config);
    assert!(manager.get_entry(&ws(), &p("/old")).unwrap().is_none());
}

#[test]
fn test_rename_edge_cases() {
    let manager = seeded_manager();
    create(&manager, "a", ProjectConfig::new("blank"));

    let absent = manager.rename(&ws(), &p("/missing"), "x", None).unwrap();
    assert_eq!(absent.value, None);

    let root = manager.rename(&ws(), &p("/"), "x", None).unwrap_err();
    assert_eq!(root.kind(), ErrorKind::Forbidden);

    let taken = manager.rename(&ws(), &p("/a"), "sources", None).unwrap_err();
    assert_eq!(taken.kind(), ErrorKind::Conflict);

    let bad_name = manager.rename(&ws(), &p("/a"), "x/y", None).unwrap_err();
    assert_eq!(bad_name.kind(), ErrorKind::InvalidPath);
}

#[test]
fn test_rename_file_sets_media_type() {
    let manager = seeded_manager();
    let entry = manager
        .rename(&ws(), &p("/notes/readme.txt"), "readme.md", Some("text/markdown"))
        .unwrap()
        .into_value()
        .unwrap();
    match entry {
        TreeEntry::File(file) => assert_eq!(file.media_type(), Some("text/markdown")),
        other => panic!("expected a file, got {other:?}"),
    }
}

#[test]
fn test_delete() {
    let manager = seeded_manager();
    create(&manager, "app", ProjectConfig::new("blank"));
    manager
        .add_module(
            &ws(),
            &p("/app"),
            "core",
            ProjectConfig::new("blank"),
            &CreateOptions::new(),
            Visibility::Public,
        )
        .unwrap();

    assert!(manager.delete(&ws(), &p("/app"), Some("core")).unwrap().value);
    assert!(manager.get_entry(&ws(), &p("/app/core")).unwrap().is_none());
    assert!(manager.get_project(&ws(), &p("/app")).unwrap().is_some());

    assert!(manager.delete(&ws(), &p("/app"), None).unwrap().value);
    assert!(!manager.delete(&ws(), &p("/app"), None).unwrap().value);

    let root = manager.delete(&ws(), &p("/"), None).unwrap_err();
    assert_eq!(root.kind(), ErrorKind::Forbidden);
}

#[test]
fn test_create_folder_and_file() {
    let manager = seeded_manager();
    manager.create_folder(&ws(), &p("/docs")).unwrap();
    let file = manager
        .create_file(&ws(), &p("/docs/index.md"), b"# hi", Some("text/markdown"))
        .unwrap()
        .into_value();
    assert_eq!(file.media_type(), Some("text/markdown"));

    let dup = manager.create_folder(&ws(), &p("/docs")).unwrap_err();
    assert_eq!(dup.kind(), ErrorKind::Conflict);
    let orphan = manager
        .create_file(&ws(), &p("/missing/a.txt"), b"", None)
        .unwrap_err();
    assert_eq!(orphan.kind(), ErrorKind::NotFound);
}

#[test]
fn test_estimate_project() {
    let manager = seeded_manager();
    let attributes = manager
        .estimate_project(&ws(), &p("/sources/demo"), "maven")
        .unwrap();
    let level = &attributes["languageLevel"];
    assert_eq!(level.values(), ["1.8".to_string()]);
    assert_eq!(level.origin(), ValueOrigin::Estimated);
    assert_eq!(attributes["artifactId"].first(), Some("demo"));

    let err = manager
        .estimate_project(&ws(), &p("/sources/demo"), "gradle")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProjectTypeConstraint);
}

#[test]
fn test_resolve_sources() {
    let manager = seeded_manager();

    let demo = manager.resolve_sources(&ws(), &p("/sources/demo"), false).unwrap();
    let types: Vec<_> = demo.iter().map(|e| e.project_type.as_str()).collect();
    assert_eq!(types, vec!["maven"]);

    let web = manager.resolve_sources(&ws(), &p("/sources/web"), true).unwrap();
    assert_eq!(web.len(), 1);
    assert_eq!(web[0].project_type, "node");
    assert_eq!(web[0].attributes["packageManager"].first(), Some("npm"));

    assert!(manager
        .resolve_sources(&ws(), &p("/notes"), false)
        .unwrap()
        .is_empty());
}

#[test]
fn test_read_only_policy() {
    let manager = seeded_manager().with_policy(Arc::new(ReadOnlyPolicy));
    assert!(manager.get_projects(&ws()).is_ok());

    let err = manager
        .create_project(
            &ws(),
            "demo",
            ProjectConfig::new("blank"),
            &CreateOptions::new(),
            Visibility::Public,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = manager.delete(&ws(), &p("/notes"), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[test]
fn test_storage_failure_is_retryable() {
    let fs = Arc::new(FlakyFileSystem::new(Arc::new(MemoryFileSystem::new())));
    let manager = manager_over(fs.clone());

    fs.fail_on(FailPoint::CreateFolder);
    let err = manager
        .create_project(
            &ws(),
            "demo",
            ProjectConfig::new("blank"),
            &CreateOptions::new(),
            Visibility::Public,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(err.is_retryable());
    assert!(manager.get_entry(&ws(), &p("/demo")).unwrap().is_none());

    fs.heal();
    create(&manager, "demo", ProjectConfig::new("blank"));
}

proptest! {
    #[test]
    fn test_rename_and_back_is_identity(name in "[a-z][a-z0-9_-]{0,7}") {
        let manager = manager_over(Arc::new(MemoryFileSystem::new()));
        let config = ProjectConfig::new("blank").with_attribute("k", [name.clone()]);
        create(&manager, "origin", config.clone());

        manager.rename(&ws(), &p("/origin"), &name, None).unwrap();
        let moved = p("/").child(&name).unwrap();
        manager.rename(&ws(), &moved, "origin", None).unwrap();

        let back = manager.get_project(&ws(), &p("/origin")).unwrap().unwrap();
        prop_assert_eq!(back.config(), &config);
        prop_assert_eq!(manager.get_projects(&ws()).unwrap().len(), 1);
    }
}
