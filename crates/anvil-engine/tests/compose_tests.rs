//! Namespace composition and end-to-end build scenarios

use anvil_engine::{
    load_project, BuildSession, EngineError, FlagCategory, FlagSet, HostPlatform, Recipe,
    Registry, VarMap,
};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn touch(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn imported_flags_merge_deterministically() {
    let mut registry = Registry::new();
    let b = registry.add_namespace("b").unwrap();
    b.append_flags(FlagCategory::Compile, ["-O2"]);
    let b_flags = b.flags().clone();

    let a = registry.add_namespace("a").unwrap();
    a.append_flags(FlagCategory::Compile, ["-Wall"]);
    a.record_import("b", &b_flags);
    assert_eq!(a.flags().get(FlagCategory::Compile), ["-O2", "-Wall"]);

    // Importing again changes nothing.
    a.record_import("b", &b_flags);
    assert_eq!(a.flags().get(FlagCategory::Compile), ["-O2", "-Wall"]);
}

#[test]
fn cross_namespace_run_chain_orders_and_short_circuits() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let run_recipe = |tag: &'static str, log: Arc<Mutex<Vec<String>>>, fail: bool| {
        Recipe::from_fn(move |_| {
            if fail {
                return Err(format!("{} exited with status 1", tag));
            }
            log.lock().unwrap().push(tag.to_string());
            Ok(())
        })
    };

    // Success path: the imported namespace's run action executes first.
    {
        let mut registry = Registry::new();
        let sub = registry.add_namespace("sub").unwrap();
        sub.set_recipe("@run", run_recipe("sub", log.clone(), false))
            .unwrap();
        let sub_flags = sub.flags().clone();

        let agg = registry.add_namespace("agg").unwrap();
        agg.record_import("sub", &sub_flags);
        agg.add_dep("@run", "sub|@run").unwrap();
        agg.set_recipe("@run", run_recipe("agg", log.clone(), false))
            .unwrap();

        BuildSession::new(&registry)
            .build("agg", Some("@run"))
            .unwrap();
        assert_eq!(*log.lock().unwrap(), ["sub", "agg"]);
    }

    // Failure path: the aggregate's own action never runs.
    log.lock().unwrap().clear();
    {
        let mut registry = Registry::new();
        let sub = registry.add_namespace("sub").unwrap();
        sub.set_recipe("@run", run_recipe("sub", log.clone(), true))
            .unwrap();
        let sub_flags = sub.flags().clone();

        let agg = registry.add_namespace("agg").unwrap();
        agg.record_import("sub", &sub_flags);
        agg.add_dep("@run", "sub|@run").unwrap();
        agg.set_recipe("@run", run_recipe("agg", log.clone(), false))
            .unwrap();

        let err = BuildSession::new(&registry)
            .build("agg", Some("@run"))
            .unwrap_err();
        assert!(matches!(err, EngineError::RecipeFailed { target, .. } if target == "sub|@run"));
        assert!(log.lock().unwrap().is_empty());
    }
}

#[test]
fn qualified_reference_without_import_fails() {
    let mut registry = Registry::new();
    registry.add_namespace("sub").unwrap();
    let agg = registry.add_namespace("agg").unwrap();
    agg.add_dep("@run", "sub|@run").unwrap();
    agg.set_recipe("@run", Recipe::from_fn(|_| Ok(()))).unwrap();

    let err = BuildSession::new(&registry)
        .build("agg", Some("@run"))
        .unwrap_err();
    assert!(matches!(err, EngineError::NotImported { .. }));
}

/// Fake toolchain: "compile" copies the source into the object with a
/// prefix, "link" concatenates the inputs. Real files, real mtimes.
fn compile_recipe() -> Recipe {
    Recipe::from_fn(|ctx| {
        let out = ctx.target_path.as_ref().unwrap();
        let src = ctx.producers.first().ok_or("no source")?;
        let content = fs::read_to_string(src).map_err(|e| e.to_string())?;
        fs::write(out, format!("obj[{}]", content)).map_err(|e| e.to_string())
    })
}

fn link_recipe() -> Recipe {
    Recipe::from_fn(|ctx| {
        let out = ctx.target_path.as_ref().unwrap();
        let mut linked = String::new();
        for input in &ctx.producers {
            linked.push_str(&fs::read_to_string(input).map_err(|e| e.to_string())?);
        }
        fs::write(out, linked).map_err(|e| e.to_string())
    })
}

#[test]
fn nut_scenario_builds_then_rebuilds_nothing() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    let a_src = root.join("src/nut/a.cpp");
    let b_src = root.join("src/nut/b.cpp");
    let t_src = root.join("src/test_nut/main.cpp");
    touch(&a_src, "a");
    touch(&b_src, "b");
    touch(&t_src, "main");

    let a_obj = root.join("out/obj/a.o");
    let b_obj = root.join("out/obj/b.o");
    let libnut = root.join("out/libnut.so");
    let t_obj = root.join("out/obj/main.o");
    let program = root.join("out/test_nut");

    let mut registry = Registry::new();
    {
        let nut = registry.add_namespace("nut").unwrap();
        nut.append_flags(FlagCategory::Preprocessor, ["-DBUILDING_NUT"]);
        for (obj, src) in [(&a_obj, &a_src), (&b_obj, &b_src)] {
            nut.add_chained_deps(
                libnut.to_str().unwrap(),
                obj.to_str().unwrap(),
                &[src.to_str().unwrap()],
            )
            .unwrap();
            nut.set_recipe(obj.to_str().unwrap(), compile_recipe())
                .unwrap();
        }
        nut.set_recipe(libnut.to_str().unwrap(), link_recipe())
            .unwrap();
        nut.set_default_target(libnut.to_str().unwrap()).unwrap();
    }

    let nut_flags = registry.get("nut").unwrap().flags().clone();
    {
        let test = registry.add_namespace("test_nut").unwrap();
        test.record_import("nut", &nut_flags);
        test.add_chained_deps(
            program.to_str().unwrap(),
            t_obj.to_str().unwrap(),
            &[t_src.to_str().unwrap()],
        )
        .unwrap();
        test.set_recipe(t_obj.to_str().unwrap(), compile_recipe())
            .unwrap();
        test.add_dep(
            program.to_str().unwrap(),
            &format!("nut|{}", libnut.to_str().unwrap()),
        )
        .unwrap();
        test.set_recipe(program.to_str().unwrap(), link_recipe())
            .unwrap();
        test.set_default_target(program.to_str().unwrap()).unwrap();
    }

    // Full build: both library sources compile, the library links, the
    // test source compiles, the program links.
    let report = BuildSession::new(&registry).build("test_nut", None).unwrap();
    assert_eq!(report.executed, 5);
    assert_eq!(fs::read_to_string(&libnut).unwrap(), "obj[a]obj[b]");
    let linked = fs::read_to_string(&program).unwrap();
    assert!(linked.contains("obj[main]"));
    assert!(linked.contains("obj[a]obj[b]"));

    // No-change rebuild: zero recipe executions.
    let report = BuildSession::new(&registry).build("test_nut", None).unwrap();
    assert_eq!(report.executed, 0);
    assert_eq!(report.fresh, 5);
}

#[test]
fn manifest_projects_compose_end_to_end() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    touch(&root.join("nut/src/a.c"), "alpha");

    touch(
        &root.join("nut/anvil.toml"),
        r#"
name = "nut"
default = "out/libnut.a"

[flags]
CFLAGS = ["-O2"]

[[targets]]
name = "out/a.o"
deps = ["src/a.c"]
recipe = { command = "cat src/a.c > out/a.o" }

[[targets]]
name = "out/libnut.a"
deps = ["out/a.o"]
recipe = { command = "cat out/a.o > out/libnut.a" }

[[targets]]
name = "@clean"
recipe = { delete = ["out"] }
"#,
    );
    touch(
        &root.join("test/anvil.toml"),
        r#"
name = "test_nut"
import = ["../nut/anvil.toml"]
default = "@check"

[flags]
CFLAGS = ["-Wall"]

[[targets]]
name = "@check"
deps = ["nut|out/libnut.a"]
recipe = { command = "test -s ../nut/out/libnut.a" }
"#,
    );

    let seed = VarMap::seeded(HostPlatform::Linux, true, "cc");
    let mut registry = Registry::new();
    load_project(
        &mut registry,
        &root.join("test/anvil.toml"),
        &seed,
        HostPlatform::Linux,
    )
    .unwrap();

    // Imported flags first, importer's own flags last.
    let flags = registry.get("test_nut").unwrap().flags().clone();
    assert_eq!(flags.get(FlagCategory::Compile), ["-O2", "-Wall"]);

    // The qualified dependency on the library crosses namespaces. The
    // manifest wrote a relative path, so qualify the loader-resolved name.
    let lib = root
        .canonicalize()
        .unwrap()
        .join("nut/out/libnut.a")
        .to_string_lossy()
        .into_owned();
    let ns = registry.get("test_nut").unwrap();
    let check = ns.graph().get("@check").unwrap();
    assert_eq!(check.deps(), [format!("nut|{}", lib)]);

    let report = BuildSession::new(&registry).build("test_nut", None).unwrap();
    // a.o, libnut.a, @check
    assert_eq!(report.executed, 3);
    assert_eq!(
        fs::read_to_string(root.join("nut/out/libnut.a")).unwrap(),
        "alpha"
    );

    // @check is an action and runs again; the library stays fresh.
    let report = BuildSession::new(&registry).build("test_nut", None).unwrap();
    assert_eq!(report.executed, 1);
    assert_eq!(report.fresh, 2);
}

#[test]
fn duplicate_flag_set_merge_is_stable() {
    let mut flags = FlagSet::new();
    flags.append(FlagCategory::Link, ["-L.", "-lnut"]);
    let mut imported = FlagSet::new();
    imported.append(FlagCategory::Link, ["-lm"]);

    let mut once = flags.clone();
    once.merge_imported(&imported);
    let mut twice = flags.clone();
    twice.merge_imported(&imported);

    assert_eq!(once, twice);
    assert_eq!(once.get(FlagCategory::Link), ["-lm", "-L.", "-lnut"]);
}
