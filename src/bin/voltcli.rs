// EN: src/bin/voltcli.rs

use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use voltcli::{
    CancellationToken,
    cli::dispatcher::{self, Invocation},
    constants::{DEFAULT_COMMAND, RUNTIME_NAME},
    core::{
        bundle::Bundle,
        utility::{self, VoltError},
    },
};

/// Starts a one-worker runtime whose only task flips `cancellation` on Ctrl+C.
/// The runtime must stay alive for the listener to keep running.
fn spawn_interrupt_listener(cancellation: &CancellationToken) -> Option<tokio::runtime::Runtime> {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::warn!("Ctrl+C handling is unavailable: {}", e);
            return None;
        }
    };
    let token = Arc::clone(cancellation);
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::debug!("Interrupt received.");
            token.store(true, Ordering::SeqCst);
        }
    });
    Some(runtime)
}

/// The entry point shared by every command.
/// The command is named after the binary (`volt`, `voltadmin`, ...). Under the
/// runtime's own name the first argument may be a package to boot.
fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Trace)
        .parse_default_env()
        .init();
    utility::apply_verbosity(false, false);

    let cancellation: CancellationToken = Arc::new(AtomicBool::new(false));
    let _runtime = spawn_interrupt_listener(&cancellation);

    if let Err(e) = run(cancellation) {
        // --- Centralized Error Handling ---
        match e.downcast_ref::<VoltError>() {
            Some(VoltError::Interrupted) => {
                eprintln!();
                utility::report_fatal(&["break".to_string()]);
            }
            // Empty when the problem was already reported.
            Some(VoltError::Abort { messages }) => utility::report_fatal(messages),
            None => utility::report_fatal(&[format!("{:#}", e)]),
        }
        std::process::exit(1);
    }
}

fn run(cancellation: CancellationToken) -> Result<()> {
    let mut args = env::args();
    let argv0 = args.next().unwrap_or_else(|| RUNTIME_NAME.to_string());
    let mut args: Vec<String> = args.collect();

    let exe_path = PathBuf::from(&argv0);
    let stem = exe_path
        .file_stem()
        .map_or_else(|| RUNTIME_NAME.to_string(), |s| s.to_string_lossy().into_owned());

    if stem == RUNTIME_NAME {
        if let Some(first) = args.first()
            && Bundle::is_bundle(Path::new(first))
        {
            let bundle = Bundle::open(Path::new(first))?;
            let bootstrap = bundle.bootstrap()?;
            log::debug!("Booting package '{}' as \"{}\".", first, bootstrap.name);
            args.remove(0);
            let invocation = Invocation {
                command_name: bootstrap.name,
                command_dir: None,
                version: bootstrap.version,
                description: bootstrap.description,
                bundle: bootstrap.package.then_some(bundle),
                args,
            };
            return dispatcher::main(invocation, cancellation);
        }
    }

    let command_name = if stem == RUNTIME_NAME {
        DEFAULT_COMMAND.to_string()
    } else {
        stem
    };
    let command_dir = exe_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dunce::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf()));

    let invocation = Invocation {
        description: dispatcher::command_description(&command_name),
        command_name,
        command_dir,
        version: env!("CARGO_PKG_VERSION").to_string(),
        bundle: None,
        args,
    };
    dispatcher::main(invocation, cancellation)
}
