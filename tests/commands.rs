use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering;
use tempfile::{TempDir, tempdir};
use voltcli::{
    cli::{base_cli_spec, dispatcher, preprocess::CommandPreprocessor, processor::CommandProcessor},
    core::{
        config::VoltConfig,
        environment::{Environment, classpath_separator},
        interpolator::Interpolator,
        java::JavaExtras,
        runner::{RunnerExtras, VerbRunner},
        utility::VoltError,
        verbspace::{VerbSpace, VerbSpaces, load_verbspace},
    },
    models::{BaseFlags, GoAction, Step, VerbBody},
};

struct Workspace {
    _lib: TempDir,
    work: TempDir,
    env: Environment,
    config: VoltConfig,
}

fn workspace(units: &[(&str, &str)]) -> Workspace {
    let lib = tempdir().unwrap();
    let work = tempdir().unwrap();
    for (file, text) in units {
        let path = lib.path().join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }
    let env = Environment::with_lib_dir("volt", "1.0", lib.path(), work.path());
    let config = VoltConfig::load(
        work.path().join("volt.cfg"),
        work.path().join("volt_local.cfg"),
        "volt",
    )
    .unwrap();
    Workspace {
        _lib: lib,
        work,
        env,
        config,
    }
}

fn load(ws: &Workspace, command: &str) -> VerbSpace {
    load_verbspace(&ws.env, command, None, "1.0", "Test.", None).unwrap()
}

fn run(ws: &mut Workspace, space: &VerbSpace, internal: &VerbSpaces, args: &[&str]) -> anyhow::Result<()> {
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    dispatcher::run_command(space, internal, &mut ws.config, &ws.env, &args)
}

fn abort_messages(err: &anyhow::Error) -> Vec<String> {
    match err.downcast_ref::<VoltError>() {
        Some(VoltError::Abort { messages }) => messages.clone(),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn preprocess_finds_verbose_without_a_verbspace() {
    let spec = base_cli_spec();
    let values = CommandPreprocessor::new(&spec.options).preprocess(&["-v".to_string(), "help".to_string()]);
    assert!(BaseFlags::from_options(&values).verbose);
}

#[test]
fn config_verb_stores_local_values() {
    let mut ws = workspace(&[]);
    let space = load(&ws, "volt");
    run(&mut ws, &space, &VerbSpaces::new(), &["config", "catalog=app.jar", "other.key = v"]).unwrap();

    assert_eq!(ws.config.get("volt.catalog"), Some("app.jar"));
    assert_eq!(ws.config.get("other.key"), Some("v"));
    assert!(ws.work.path().join("volt_local.cfg").exists());
    assert!(!ws.work.path().join("volt.cfg").exists());
}

#[test]
fn config_verb_rejects_bad_arguments() {
    let mut ws = workspace(&[]);
    let space = load(&ws, "volt");

    let err = run(&mut ws, &space, &VerbSpaces::new(), &["config", "a=1", "oops"]).unwrap_err();
    assert_eq!(
        abort_messages(&err),
        vec!["Bad arguments (must be KEY=VALUE format):", "    oops"]
    );
    assert_eq!(ws.config.get("volt.a"), None);

    let err = run(&mut ws, &space, &VerbSpaces::new(), &["config"]).unwrap_err();
    assert_eq!(abort_messages(&err), vec!["At least one argument is required."]);
}

#[test]
fn interrupt_stops_native_verbs() {
    let mut ws = workspace(&[]);
    let space = load(&ws, "volt");
    ws.env.cancellation.store(true, Ordering::SeqCst);

    let err = run(&mut ws, &space, &VerbSpaces::new(), &["config", "catalog=x"]).unwrap_err();
    assert!(matches!(err.downcast_ref::<VoltError>(), Some(VoltError::Interrupted)));
    assert_eq!(ws.config.get("volt.catalog"), None);

    let out = ws.work.path().join("out");
    fs::create_dir_all(&out).unwrap();
    let out_arg = out.display().to_string();
    let err = run(&mut ws, &space, &VerbSpaces::new(), &["package", out_arg.as_str()]).unwrap_err();
    assert!(matches!(err.downcast_ref::<VoltError>(), Some(VoltError::Interrupted)));
    assert!(!out.join("volt").exists());
}

#[test]
fn required_configuration_is_reported_with_guidance() {
    let mut ws = workspace(&[(
        "volt.d/compile.toml",
        "[[verb]]\nname = \"compile\"\nsteps = [{ echo = \"<catalog>\" }]\n",
    )]);
    let space = load(&ws, "volt");
    let err = run(&mut ws, &space, &VerbSpaces::new(), &["compile"]).unwrap_err();
    let messages = abort_messages(&err);
    assert_eq!(messages[0], "Configuration parameter \"volt.catalog\" was not found.");
    assert_eq!(messages[2], "    volt config volt.catalog=VALUE");
}

#[test]
fn java_verb_builds_its_command_line() {
    let mut ws = workspace(&[(
        "volt.d/server.toml",
        r#"
[[verb]]
name = "create"
java_class = "org.voltdb.VoltDB"
classpath = "verb.jar"
steps = [{ go = ["create", "host", "<opts::host>"] }]

[[verb.option]]
short = "-H"
long = "--host"
dest = "host"
kind = "string"
default = "localhost"
"#,
    )]);
    ws.env.classpath = vec!["env.jar".to_string()];
    ws.config.set_local("volt.classpath", "config.jar").unwrap();
    let space = load(&ws, "volt");
    run(&mut ws, &space, &VerbSpaces::new(), &["-n", "create", "-H", "db1"]).unwrap();

    let argv: Vec<String> = ["create", "-H", "db1"].iter().map(|s| s.to_string()).collect();
    let processor = CommandProcessor::new(&space);
    let command = processor.parse(&argv).unwrap();
    let internal = VerbSpaces::new();
    let runner = VerbRunner::new(
        command,
        &space,
        &internal,
        &mut ws.config,
        &processor,
        &ws.env,
        &RunnerExtras::default(),
    )
    .unwrap();

    let Some(GoAction::Java { class }) = &runner.verb.go_default else {
        panic!("create should default to a Java class");
    };
    let VerbBody::Script(steps) = &runner.verb.body else {
        panic!("create should be a script verb");
    };
    let [Step::Go(templates)] = steps.as_slice() else {
        panic!("unexpected steps: {:?}", steps);
    };
    let go_args = Interpolator::new(
        &runner.verb.name,
        &runner.args,
        &runner.opts,
        &*runner.config,
        &runner.project_path,
    )
    .expand_list(templates)
    .unwrap();
    let command_line = runner.java.build_command(class, &[], &go_args, &JavaExtras::default());

    let cp = command_line.iter().position(|a| a == "-classpath").unwrap();
    assert_eq!(
        command_line[cp + 1],
        ["verb.jar", "env.jar", "config.jar"].join(classpath_separator())
    );
    assert_eq!(
        &command_line[cp + 2..],
        &["org.voltdb.VoltDB", "create", "host", "db1"].map(String::from)[..]
    );
}

#[test]
fn cross_verbspace_call_reaches_internal_command() {
    let mut ws = workspace(&[
        (
            "tool.d/outer.toml",
            "[[verb]]\nname = \"outer\"\nsteps = [{ call = { verb = \"voltadmin.mk\", args = [\"<args::0>\"] } }]\n",
        ),
        (
            "voltadmin.d/mk.toml",
            "[[verb]]\nname = \"mk\"\nsteps = [{ mkdir = \"<args::0>\" }]\n",
        ),
    ]);
    let tool = load(&ws, "tool");
    let internal = dispatcher::load_internal_verbspaces(&ws.env, "tool", "1.0").unwrap();
    let target = ws.work.path().join("made-by-admin");
    let target_arg = target.display().to_string();

    run(&mut ws, &tool, &internal, &["outer", target_arg.as_str()]).unwrap();
    assert!(target.is_dir());
}

#[test]
fn unknown_verb_is_fatal() {
    let mut ws = workspace(&[]);
    let space = load(&ws, "volt");
    let err = run(&mut ws, &space, &VerbSpaces::new(), &["frobnicate"]).unwrap_err();
    assert_eq!(abort_messages(&err), vec!["Unknown verb \"frobnicate\"."]);
}

#[cfg(unix)]
#[test]
fn shell_step_tolerates_failure_with_dash_prefix() {
    let mut ws = workspace(&[(
        "volt.d/clean.toml",
        "[[verb]]\nname = \"clean\"\nsteps = [{ shell = [\"-false\"] }, { shell = [\"true\"] }]\n\n\
         [[verb]]\nname = \"strict\"\nsteps = [{ shell = [\"false\"] }]\n",
    )]);
    let space = load(&ws, "volt");
    run(&mut ws, &space, &VerbSpaces::new(), &["clean"]).unwrap();
    assert!(run(&mut ws, &space, &VerbSpaces::new(), &["strict"]).is_err());
}

#[test]
fn sample_library_loads() {
    let lib = Path::new(env!("CARGO_MANIFEST_DIR")).join("lib").join("voltcli");
    let work = tempdir().unwrap();
    let env = Environment::with_lib_dir("volt", "1.0", &lib, work.path());
    let volt = load_verbspace(&env, "volt", None, "1.0", "Volt.", None).unwrap();
    for name in ["compile", "build", "create", "recover", "clean", "config", "help", "package"] {
        assert!(volt.verb(name).is_some(), "missing verb {}", name);
    }
    let admin = load_verbspace(&env, "voltadmin", None, "1.0", "Admin.", None).unwrap();
    assert!(admin.verb("shutdown").is_some());
}
