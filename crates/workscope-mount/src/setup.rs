//! Scan-then-narrow sandbox orchestration.

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::PathBuf;

use workscope_core::{DEFAULT_MAX_DEPTH, EnvSnapshot, MountSpec, WorkspacesFile, flatten_mounts, vars};

use crate::error::PlanError;
use crate::planner::{MountPlan, MountPlanner};
use crate::runtime::{CommandOutput, ContainerRuntime};

/// Names and paths used by the setup sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupConfig {
    pub run_container: String,
    pub scan_container: String,
    pub image: String,
    pub port: String,
    pub data_volume: String,
    pub workspaces_volume: String,
    pub max_depth: String,
    /// Where the data volume is mounted in both containers.
    pub data_dir: PathBuf,
    /// Where the workspaces volume is mounted; the registry lives here.
    pub state_dir: PathBuf,
    /// Command that runs discovery inside the scanner container.
    pub scan_command: Vec<String>,
}

impl SetupConfig {
    /// Read container, image, port, volume and depth settings.
    pub fn from_env(env: &EnvSnapshot) -> Self {
        let run_container = env.get_or(vars::CONTAINER, "workscope-dev").to_string();
        let default_depth = DEFAULT_MAX_DEPTH.to_string();
        Self {
            scan_container: format!("{run_container}-scan"),
            run_container,
            image: env.get_or(vars::IMAGE, "workscope:latest").to_string(),
            port: env.get_or(vars::PORT, "8080").to_string(),
            data_volume: env.get_or(vars::DATA_VOLUME, "workscope-data").to_string(),
            workspaces_volume: env
                .get_or(vars::WORKSPACES_VOLUME, "workscope-workspaces")
                .to_string(),
            max_depth: env.get_or(vars::SCAN_MAX_DEPTH, &default_depth).to_string(),
            data_dir: PathBuf::from("/data"),
            state_dir: PathBuf::from("/root/.workscope"),
            scan_command: vec!["workscope".to_string(), "scan".to_string()],
        }
    }

    /// Record file path inside the containers.
    pub fn record_path(&self) -> PathBuf {
        self.state_dir.join("workspaces.json")
    }

    fn volume_args(&self) -> Vec<String> {
        vec![
            "-v".to_string(),
            format!("{}:{}", self.data_volume, self.data_dir.display()),
            "-v".to_string(),
            format!("{}:{}", self.workspaces_volume, self.state_dir.display()),
        ]
    }
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self::from_env(&EnvSnapshot::default())
    }
}

/// Everything the setup sequence observed and decided.
#[derive(Debug, Clone)]
pub struct SetupReport {
    pub wide_mounts: Vec<MountSpec>,
    /// Output of the discovery command inside the scanner.
    pub scan_output: CommandOutput,
    pub discovered: WorkspacesFile,
    pub plan: MountPlan,
}

/// Runs discovery in a wide sandbox, then starts the workload with narrowed mounts.
pub struct SetupPipeline<R> {
    config: SetupConfig,
    runtime: R,
    planner: MountPlanner,
    stdout: RefCell<Box<dyn Write>>,
    stderr: RefCell<Box<dyn Write>>,
}

impl<R: ContainerRuntime> SetupPipeline<R> {
    pub fn new(config: SetupConfig, runtime: R) -> Self {
        Self {
            config,
            runtime,
            planner: MountPlanner::new(),
            stdout: RefCell::new(Box::new(io::stdout())),
            stderr: RefCell::new(Box::new(io::stderr())),
        }
    }

    /// Where the scan's own output is echoed. Defaults to the process streams.
    pub fn with_output(mut self, stdout: impl Write + 'static, stderr: impl Write + 'static) -> Self {
        self.stdout = RefCell::new(Box::new(stdout));
        self.stderr = RefCell::new(Box::new(stderr));
        self
    }

    pub fn with_planner(mut self, planner: MountPlanner) -> Self {
        self.planner = planner;
        self
    }

    pub fn config(&self) -> &SetupConfig {
        &self.config
    }

    /// Run the whole sequence with the given wide mounts.
    pub fn run(&self, wide_mounts: &[MountSpec]) -> Result<SetupReport, PlanError> {
        let cfg = &self.config;

        section("Ensuring volumes");
        self.exec(&["volume", "create", &cfg.data_volume], Mode::Tolerant)?;
        self.exec(&["volume", "create", &cfg.workspaces_volume], Mode::Tolerant)?;

        section("Stopping existing containers");
        self.stop_container(&cfg.run_container)?;
        self.stop_container(&cfg.scan_container)?;

        section("Starting temporary scanner container");
        let mut args = strings(&["run", "-d", "--name", &cfg.scan_container]);
        args.extend(strings(&["-e", &format!("PORT={}", cfg.port)]));
        args.extend(cfg.volume_args());
        args.extend(flatten_mounts(wide_mounts));
        args.extend(strings(&[&cfg.image, "sh", "-c", "sleep infinity"]));
        self.run_args(args, Mode::Strict)?;

        section("Running agent scan");
        let mut args = strings(&["exec", "-e", "WORKSCOPE_LOG=debug", &cfg.scan_container]);
        args.extend(cfg.scan_command.iter().cloned());
        args.extend(strings(&["--max-depth", &cfg.max_depth]));
        args.extend(wide_mounts.iter().map(|m| m.dest.to_string_lossy().into_owned()));
        let scan_output = self.runtime.run(&args, true)?;
        self.echo(&scan_output);
        let scan_output = self.check(args, scan_output, Mode::Captured)?;

        section("Reading discovered workspaces");
        let record_path = cfg.record_path();
        let record = self.run_args(
            strings(&["exec", &cfg.scan_container, "cat", &record_path.to_string_lossy()]),
            Mode::CapturedTolerant,
        )?;
        let discovered = WorkspacesFile::parse_lenient(&record.stdout);
        if discovered.is_empty() {
            tracing::warn!("No workspaces discovered. Keeping wide mounts.");
        }

        section("Stopping scanner container");
        self.stop_container(&cfg.scan_container)?;

        section("Building mount plan");
        let plan = self.planner.plan(discovered.paths(), wide_mounts);

        section(&format!(
            "Starting {} with {} workspace mount{}",
            cfg.run_container,
            plan.mounts.len(),
            if plan.mounts.len() == 1 { "" } else { "s" }
        ));
        let mut args = strings(&["run", "-d", "--name", &cfg.run_container]);
        args.extend(strings(&["-p", &format!("{0}:{0}", cfg.port)]));
        args.extend(strings(&["-e", &format!("PORT={}", cfg.port)]));
        args.extend(cfg.volume_args());
        args.extend(flatten_mounts(&plan.mounts));
        args.push(cfg.image.clone());
        self.run_args(args, Mode::Strict)?;

        section("Done");
        Ok(SetupReport {
            wide_mounts: wide_mounts.to_vec(),
            scan_output,
            discovered,
            plan,
        })
    }

    fn stop_container(&self, name: &str) -> Result<(), PlanError> {
        if name.is_empty() {
            return Ok(());
        }
        self.exec(&["stop", name], Mode::Tolerant)?;
        self.exec(&["rm", name], Mode::Tolerant)?;
        Ok(())
    }

    fn exec(&self, args: &[&str], mode: Mode) -> Result<CommandOutput, PlanError> {
        self.run_args(strings(args), mode)
    }

    fn run_args(&self, args: Vec<String>, mode: Mode) -> Result<CommandOutput, PlanError> {
        let output = self.runtime.run(&args, mode.captures())?;
        self.check(args, output, mode)
    }

    fn check(
        &self,
        args: Vec<String>,
        output: CommandOutput,
        mode: Mode,
    ) -> Result<CommandOutput, PlanError> {
        if !output.success && !mode.tolerates_failure() {
            let command = format!("{} {}", self.runtime.program(), args.join(" "));
            tracing::error!("{command} failed");
            if !output.stderr.trim().is_empty() {
                tracing::error!("{}", output.stderr.trim_end());
            }
            return Err(PlanError::CommandFailed {
                command,
                status: output.status,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }

    /// Pass captured output through to the configured streams.
    fn echo(&self, output: &CommandOutput) {
        let written = self
            .stdout
            .borrow_mut()
            .write_all(output.stdout.as_bytes())
            .and_then(|()| self.stderr.borrow_mut().write_all(output.stderr.as_bytes()));
        if let Err(err) = written {
            tracing::debug!("Cannot echo scan output: {err}");
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Strict,
    Tolerant,
    Captured,
    CapturedTolerant,
}

impl Mode {
    fn captures(self) -> bool {
        matches!(self, Self::Captured | Self::CapturedTolerant)
    }

    fn tolerates_failure(self) -> bool {
        matches!(self, Self::Tolerant | Self::CapturedTolerant)
    }
}

fn section(message: &str) {
    tracing::info!("=== {message} ===");
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::rc::Rc;

    use super::*;

    /// Clonable in-memory writer.
    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Records every command and answers from a script.
    #[derive(Default)]
    struct FakeRuntime {
        log: RefCell<Vec<Vec<String>>>,
        record: String,
        fail_scan: bool,
        fail_volumes: bool,
    }

    impl FakeRuntime {
        fn commands(&self) -> Vec<String> {
            self.log.borrow().iter().map(|args| args.join(" ")).collect()
        }
    }

    impl ContainerRuntime for FakeRuntime {
        fn program(&self) -> &str {
            "docker"
        }

        fn run(&self, args: &[String], _capture: bool) -> Result<CommandOutput, PlanError> {
            self.log.borrow_mut().push(args.to_vec());
            let output = match args.first().map(String::as_str) {
                Some("volume") if self.fail_volumes => CommandOutput::failed("exit status: 1", "exists"),
                Some("exec") if args.iter().any(|a| a == "cat") => CommandOutput::ok(self.record.clone()),
                Some("exec") if self.fail_scan => CommandOutput::failed("exit status: 2", "scan broke"),
                Some("exec") => CommandOutput {
                    stderr: "DEBUG reading /host\n".to_string(),
                    ..CommandOutput::ok("Discovered 1 workspace.\n")
                },
                _ => CommandOutput::ok(""),
            };
            Ok(output)
        }
    }

    fn always(_: &Path) -> bool {
        true
    }

    fn wide() -> Vec<MountSpec> {
        vec![MountSpec::new("/", "/host"), MountSpec::mirror("/mnt/c")]
    }

    fn record_json(paths: &[&str]) -> String {
        let entries: Vec<String> = paths
            .iter()
            .map(|p| format!(r#"{{"path":"{p}","name":"x","lastSeen":1}}"#))
            .collect();
        format!(r#"{{"version":1,"workspaces":[{}]}}"#, entries.join(","))
    }

    fn pipeline(runtime: FakeRuntime) -> SetupPipeline<FakeRuntime> {
        SetupPipeline::new(SetupConfig::default(), runtime)
            .with_planner(MountPlanner::new().with_host_probe(always))
            .with_output(io::sink(), io::sink())
    }

    #[test]
    fn test_runs_scan_then_narrowed_container() {
        let runtime = FakeRuntime {
            record: record_json(&["/host/home/me/proj", "/mnt/c/code"]),
            ..FakeRuntime::default()
        };
        let setup = pipeline(runtime);
        let report = setup.run(&wide()).unwrap();

        assert_eq!(report.discovered.len(), 2);
        assert_eq!(
            report.plan.mounts,
            vec![
                MountSpec::new("/home/me/proj", "/host/home/me/proj"),
                MountSpec::mirror("/mnt/c/code"),
            ]
        );

        let commands = setup.runtime.commands();
        let scan = commands
            .iter()
            .position(|c| c.starts_with("exec -e WORKSCOPE_LOG=debug workscope-dev-scan"))
            .unwrap();
        assert!(commands[scan].ends_with("workscope scan --max-depth 8 /host /mnt/c"));

        let scanner = commands
            .iter()
            .position(|c| c.starts_with("run -d --name workscope-dev-scan"))
            .unwrap();
        assert!(scanner < scan);
        assert!(commands[scanner].contains("-v /:/host -v /mnt/c:/mnt/c"));
        assert!(commands[scanner].ends_with("workscope:latest sh -c sleep infinity"));

        let last = commands.last().unwrap();
        assert!(last.starts_with("run -d --name workscope-dev -p 8080:8080"));
        assert!(last.contains("-v /home/me/proj:/host/home/me/proj -v /mnt/c/code:/mnt/c/code"));
        assert!(!last.contains("-v /:/host"));
        assert!(last.ends_with("workscope:latest"));
    }

    #[test]
    fn test_empty_record_keeps_wide_mounts() {
        let setup = pipeline(FakeRuntime::default());
        let report = setup.run(&wide()).unwrap();

        assert!(report.discovered.is_empty());
        assert!(report.plan.is_fallback());
        assert_eq!(report.plan.mounts, wide());

        let commands = setup.runtime.commands();
        assert!(commands.last().unwrap().contains("-v /:/host -v /mnt/c:/mnt/c"));
    }

    #[test]
    fn test_volume_failures_are_tolerated() {
        let runtime = FakeRuntime {
            fail_volumes: true,
            ..FakeRuntime::default()
        };
        assert!(pipeline(runtime).run(&wide()).is_ok());
    }

    #[test]
    fn test_scan_failure_aborts_before_workload() {
        let runtime = FakeRuntime {
            fail_scan: true,
            ..FakeRuntime::default()
        };
        let setup = pipeline(runtime);
        let err = setup.run(&wide()).unwrap_err();

        match err {
            PlanError::CommandFailed { command, stderr, .. } => {
                assert!(command.starts_with("docker exec"));
                assert_eq!(stderr, "scan broke");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(
            !setup
                .runtime
                .commands()
                .iter()
                .any(|c| c.starts_with("run -d --name workscope-dev "))
        );
    }

    #[test]
    fn test_config_from_env() {
        let env = EnvSnapshot::from_pairs([
            (vars::CONTAINER, "agents"),
            (vars::PORT, "9090"),
            (vars::SCAN_MAX_DEPTH, "3"),
        ]);
        let config = SetupConfig::from_env(&env);

        assert_eq!(config.run_container, "agents");
        assert_eq!(config.scan_container, "agents-scan");
        assert_eq!(config.image, "workscope:latest");
        assert_eq!(config.port, "9090");
        assert_eq!(config.max_depth, "3");
        assert_eq!(config.record_path(), PathBuf::from("/root/.workscope/workspaces.json"));
    }

    #[test]
    fn test_config_defaults() {
        let config = SetupConfig::default();
        assert_eq!(config.run_container, "workscope-dev");
        assert_eq!(config.scan_container, "workscope-dev-scan");
        assert_eq!(config.data_volume, "workscope-data");
        assert_eq!(config.workspaces_volume, "workscope-workspaces");
        assert_eq!(config.max_depth, "8");
    }

    #[test]
    fn test_scan_output_is_echoed() {
        let (out, err) = (SharedBuf::default(), SharedBuf::default());
        let setup = SetupPipeline::new(SetupConfig::default(), FakeRuntime::default())
            .with_planner(MountPlanner::new().with_host_probe(always))
            .with_output(out.clone(), err.clone());
        let report = setup.run(&wide()).unwrap();

        assert_eq!(out.text(), "Discovered 1 workspace.\n");
        assert_eq!(err.text(), "DEBUG reading /host\n");
        assert_eq!(report.scan_output.stderr, "DEBUG reading /host\n");
    }

    #[test]
    fn test_failed_scan_still_echoes_stderr() {
        let (out, err) = (SharedBuf::default(), SharedBuf::default());
        let runtime = FakeRuntime {
            fail_scan: true,
            ..FakeRuntime::default()
        };
        let setup = SetupPipeline::new(SetupConfig::default(), runtime)
            .with_output(out.clone(), err.clone());
        let err_value = setup.run(&wide()).unwrap_err();

        assert_eq!(err.text(), "scan broke");
        assert!(err_value.to_string().contains("scan broke"));
    }
}
