//! `Run`: execute a named, project-defined command in source or feature mode.

use crate::config::CommandScope;
use crate::error::RampError;
use crate::progress::{OutputStreamer, ProgressSink};

use super::LifecycleContext;

/// Caller-supplied knobs for one `Run` invocation.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub feature: Option<String>,
    pub args: Vec<String>,
}

/// Look up and execute `command_name`, in source mode if `opts.feature` is
/// `None`, else in feature mode for the named feature. Returns the
/// subprocess exit code on completion.
pub fn run(
    ctx: &LifecycleContext,
    command_name: &str,
    opts: &RunOptions,
    progress: &mut dyn ProgressSink,
    output: &mut dyn OutputStreamer,
) -> anyhow::Result<i32> {
    let command = ctx
        .config
        .get_command(command_name)
        .ok_or_else(|| RampError::not_found("command", command_name.to_string()))?;

    match (command.scope, &opts.feature) {
        (Some(CommandScope::Source), Some(_)) => {
            return Err(RampError::conflict(
                "command scope",
                format!("'{command_name}' is source-scoped and cannot run against a feature"),
            )
            .into());
        }
        (Some(CommandScope::Feature), None) => {
            return Err(RampError::conflict(
                "command scope",
                format!("'{command_name}' is feature-scoped and requires a feature name"),
            )
            .into());
        }
        _ => {}
    }

    let script = if std::path::Path::new(&command.command).is_absolute() {
        std::path::PathBuf::from(&command.command)
    } else {
        command.base_dir.join(&command.command)
    };
    if !script.exists() {
        return Err(RampError::not_found("command script", script.display().to_string()).into());
    }

    let (cwd, mut env) = match &opts.feature {
        None => (ctx.project_dir.to_path_buf(), super::env::source_env(ctx.project_dir, ctx.config)),
        Some(feature) => {
            let ports = ctx
                .port_settings()
                .and_then(|_| {
                    crate::ports::PortAllocator::load(ctx.project_dir, ctx.config.base_port?, ctx.config.max_ports?)
                        .ok()
                        .and_then(|a| a.get_ports(feature).map(<[u16]>::to_vec))
                })
                .unwrap_or_default();
            let display_name = crate::metadata::FeatureMetadataStore::load(ctx.project_dir)
                .ok()
                .and_then(|s| s.get_display_name(feature).map(str::to_string));
            let env = super::env::feature_env(ctx.project_dir, ctx.config, feature, display_name.as_deref(), &ports);
            (ctx.feature_trees_dir(feature), env)
        }
    };
    env.insert("RAMP_COMMAND_NAME".to_string(), command_name.to_string());

    progress.stop();
    let exit_code = crate::process::run_streamed(&script, &opts.args, &cwd, &env, output, None, None)?;

    if exit_code == 0 {
        let hooks = ctx.config.hooks_for_event(crate::config::HookEvent::Run);
        let hooks: Vec<crate::config::Hook> = hooks.into_iter().cloned().collect();
        crate::hooks::run(&hooks, crate::config::HookEvent::Run, Some(command_name), &cwd, &env, progress);
    }

    Ok(exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Command, MergedConfig, ProjectConfig};
    use crate::progress::{CollectingOutputStreamer, NullProgressSink};

    fn config(commands: Vec<Command>) -> MergedConfig {
        crate::config::merge(
            &ProjectConfig {
                commands,
                ..Default::default()
            },
            None,
            None,
            std::path::Path::new("/proj"),
            None,
        )
    }

    #[test]
    fn unknown_command_is_not_found() {
        let cfg = config(vec![]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = LifecycleContext::new(dir.path(), &cfg);
        let mut progress = NullProgressSink;
        let mut output = CollectingOutputStreamer::default();
        let err = run(&ctx, "missing", &RunOptions::default(), &mut progress, &mut output).unwrap_err();
        assert!(matches!(err.downcast_ref::<RampError>(), Some(RampError::NotFound { .. })));
    }

    #[test]
    fn source_scoped_command_rejects_feature_name() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(vec![Command {
            name: "build".into(),
            command: "build.sh".into(),
            scope: Some(CommandScope::Source),
            base_dir: dir.path().to_path_buf(),
        }]);
        let ctx = LifecycleContext::new(dir.path(), &cfg);
        let mut progress = NullProgressSink;
        let mut output = CollectingOutputStreamer::default();
        let opts = RunOptions {
            feature: Some("f".into()),
            ..Default::default()
        };
        let err = run(&ctx, "build", &opts, &mut progress, &mut output).unwrap_err();
        assert!(matches!(err.downcast_ref::<RampError>(), Some(RampError::Conflict { .. })));
    }

    #[test]
    fn feature_scoped_command_requires_feature_name() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(vec![Command {
            name: "serve".into(),
            command: "serve.sh".into(),
            scope: Some(CommandScope::Feature),
            base_dir: dir.path().to_path_buf(),
        }]);
        let ctx = LifecycleContext::new(dir.path(), &cfg);
        let mut progress = NullProgressSink;
        let mut output = CollectingOutputStreamer::default();
        let err = run(&ctx, "serve", &RunOptions::default(), &mut progress, &mut output).unwrap_err();
        assert!(matches!(err.downcast_ref::<RampError>(), Some(RampError::Conflict { .. })));
    }

    #[test]
    #[cfg(unix)]
    fn runs_source_mode_script_and_streams_output() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("build.sh");
        std::fs::write(&script, "#!/usr/bin/env bash\necho building\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let cfg = config(vec![Command {
            name: "build".into(),
            command: "build.sh".into(),
            scope: None,
            base_dir: dir.path().to_path_buf(),
        }]);
        let ctx = LifecycleContext::new(dir.path(), &cfg);
        let mut progress = NullProgressSink;
        let mut output = CollectingOutputStreamer::default();
        let code = run(&ctx, "build", &RunOptions::default(), &mut progress, &mut output).unwrap();
        assert_eq!(code, 0);
        assert_eq!(output.lines, vec!["building".to_string()]);
    }
}
