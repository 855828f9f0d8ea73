//! Daemon configuration.
//!
//! Every setting can be given as a flag or through the environment variable
//! next to it. The environment is read once, when the command line is parsed.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use libvolume::api::validate_api_url;
use libvolume::config::{DEFAULT_CONFIGURATION_NAME, DEFAULT_MOUNT_ROOT};
use libvolume::{DriverConfig, ReadinessConfig, ReadinessPolicy};

/// Where the container host looks for plugin sockets.
pub const DEFAULT_PLUGIN_SOCKET: &str = "/run/docker/plugins/quobyte.sock";

/// Readiness check strategy, as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Poll with exponential backoff until the mount point appears.
    Poll,
    /// Create the mount point, wait once, verify once.
    Trigger,
}

impl From<PolicyArg> for ReadinessPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Poll => ReadinessPolicy::Poll,
            PolicyArg::Trigger => ReadinessPolicy::TriggerThenVerify,
        }
    }
}

/// Docker volume plugin for Quobyte.
#[derive(Debug, Parser)]
#[command(name = "volumed", version, about)]
pub struct Args {
    /// Path where Quobyte is mounted on the host
    #[arg(long, env = "QUOBYTE_MOUNT_PATH", default_value = DEFAULT_MOUNT_ROOT)]
    pub path: PathBuf,

    /// Fuse options to be used when Quobyte is mounted
    #[arg(
        long,
        env = "QUOBYTE_MOUNT_OPTIONS",
        default_value = "-o user_xattr",
        allow_hyphen_values = true
    )]
    pub options: String,

    /// User to connect to the Quobyte API server
    #[arg(long, env = "QUOBYTE_API_USER", default_value = "root")]
    pub user: String,

    /// Password for the user to connect to the Quobyte API server
    #[arg(
        long,
        env = "QUOBYTE_API_PASSWORD",
        default_value = "quobyte",
        hide_env_values = true
    )]
    pub password: String,

    /// URL of the API server in the form http(s)://host[:port]
    #[arg(long, env = "QUOBYTE_API_URL", default_value = "http://localhost:7860")]
    pub api: String,

    /// Registry server(s) in the form host[:port][,host:port] or SRV record name
    #[arg(long, env = "QUOBYTE_REGISTRY", default_value = "localhost:7861")]
    pub registry: String,

    /// Group owning the plugin socket
    #[arg(long, env = "QUOBYTE_SOCKET_GROUP", default_value = "root")]
    pub group: String,

    /// Path of the plugin socket
    #[arg(long, env = "QUOBYTE_PLUGIN_SOCKET", default_value = DEFAULT_PLUGIN_SOCKET)]
    pub socket: PathBuf,

    /// Default tenant for new volumes and the tenant used for removal
    #[arg(long, env = "QUOBYTE_TENANT_ID", default_value = "")]
    pub tenant_id: String,

    /// Default volume configuration for new volumes
    #[arg(
        long,
        env = "QUOBYTE_VOLUME_CONFIG_NAME",
        default_value = DEFAULT_CONFIGURATION_NAME
    )]
    pub configuration_name: String,

    /// Maximum number of mount point checks after a create
    #[arg(
        long,
        env = "QUOBYTE_MAX_FS_CHECKS",
        default_value_t = 5,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_fs_checks: u32,

    /// Maximum time in seconds to wait for a new mount point
    #[arg(long, env = "QUOBYTE_MAX_WAIT_TIME", default_value_t = 30)]
    pub max_wait_time: u64,

    /// How to wait for a new mount point
    #[arg(
        long,
        env = "QUOBYTE_READINESS_POLICY",
        value_enum,
        default_value_t = PolicyArg::Poll
    )]
    pub readiness_policy: PolicyArg,

    /// Timeout in seconds for a single API request
    #[arg(long, env = "QUOBYTE_API_TIMEOUT", default_value_t = 30)]
    pub api_timeout: u64,

    /// Do not mount the Quobyte namespace at startup
    #[arg(long)]
    pub skip_namespace_mount: bool,

    /// Emit logs as JSON
    #[arg(long, env = "QUOBYTE_LOG_JSON")]
    pub log_json: bool,
}

impl Args {
    /// Reject settings the daemon cannot start with.
    pub fn validate(&self) -> Result<()> {
        validate_api_url(&self.api).context("invalid --api")?;
        Ok(())
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout)
    }

    /// Driver settings derived from the command line.
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            mount_root: self.path.clone(),
            default_configuration_name: self.configuration_name.clone(),
            default_tenant_id: self.tenant_id.clone(),
            readiness: ReadinessConfig {
                policy: self.readiness_policy.into(),
                max_attempts: self.max_fs_checks,
                deadline: Duration::from_secs(self.max_wait_time),
                ..ReadinessConfig::default()
            },
            ..DriverConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::{CommandFactory, FromArgMatches};

    use super::*;

    /// Parse `args` with every environment fallback disabled, so `QUOBYTE_*`
    /// variables of the test process cannot leak in.
    fn try_parse(args: &[&str]) -> Result<Args, clap::Error> {
        let matches = Args::command()
            .mut_args(|arg| arg.env(None::<&'static str>))
            .try_get_matches_from(std::iter::once("volumed").chain(args.iter().copied()))?;
        Args::from_arg_matches(&matches)
    }

    fn parse(args: &[&str]) -> Args {
        try_parse(args).unwrap()
    }

    #[test]
    fn defaults_match_documented_values() {
        let args = parse(&[]);
        assert_eq!(args.path, Path::new("/run/docker/quobyte/mnt"));
        assert_eq!(args.options, "-o user_xattr");
        assert_eq!(args.api, "http://localhost:7860");
        assert_eq!(args.registry, "localhost:7861");
        assert_eq!(args.socket, Path::new("/run/docker/plugins/quobyte.sock"));
        assert_eq!(args.max_fs_checks, 5);
        assert_eq!(args.readiness_policy, PolicyArg::Poll);
        assert_eq!(args.tenant_id, "");
        assert!(!args.log_json);
        args.validate().unwrap();
    }

    #[test]
    fn driver_config_from_flags() {
        let args = parse(&[
            "--path",
            "/mnt/q",
            "--tenant-id",
            "tenant-a",
            "--configuration-name",
            "FAST",
            "--max-fs-checks",
            "7",
            "--max-wait-time",
            "12",
            "--readiness-policy",
            "trigger",
        ]);
        let config = args.driver_config();
        assert_eq!(config.mount_root, Path::new("/mnt/q"));
        assert_eq!(config.default_tenant_id, "tenant-a");
        assert_eq!(config.default_configuration_name, "FAST");
        assert_eq!(config.default_user, "root");
        assert_eq!(config.readiness.max_attempts, 7);
        assert_eq!(config.readiness.deadline, Duration::from_secs(12));
        assert_eq!(config.readiness.policy, ReadinessPolicy::TriggerThenVerify);
    }

    #[test]
    fn mount_options_may_start_with_a_hyphen() {
        let args = parse(&["--options", "-o allow_other"]);
        assert_eq!(args.options, "-o allow_other");
    }

    #[test]
    fn api_url_without_scheme_is_rejected() {
        let args = parse(&["--api", "localhost:7860"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn zero_fs_checks_is_rejected() {
        assert!(try_parse(&["--max-fs-checks", "0"]).is_err());
    }
}
