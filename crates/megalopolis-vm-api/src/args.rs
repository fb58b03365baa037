use std::time::Duration;

use clap::Parser;

use crate::backend::CliVmConfig;
use crate::listing::DEFAULT_HEADER_TOKEN;

#[derive(Debug, Parser)]
#[command(name = "megalopolis-vm-api", author, version, about = "HTTP facade over a VM management CLI")]
pub struct Args {
    #[arg(long, env = "MEGALOPOLIS_VM_API_ADDR", default_value = "127.0.0.1:8082")]
    pub listen_addr: String,

    /// VM management binary providing `list`, `run` and `stop`.
    #[arg(long, env = "MEGALOPOLIS_VM_BIN", default_value = "tart")]
    pub vm_bin: String,

    /// First token of the header row in `list` output.
    #[arg(long, env = "MEGALOPOLIS_VM_HEADER_TOKEN", default_value = DEFAULT_HEADER_TOKEN)]
    pub header_token: String,

    /// Extra flags passed to `run <name>`, comma separated.
    #[arg(
        long,
        env = "MEGALOPOLIS_VM_RUN_FLAGS",
        default_value = "--no-graphics",
        value_delimiter = ',',
        allow_hyphen_values = true
    )]
    pub run_flags: Vec<String>,

    #[arg(long, env = "MEGALOPOLIS_VM_LIST_TIMEOUT_SECS", default_value_t = 10)]
    pub list_timeout_secs: u64,

    #[arg(long, env = "MEGALOPOLIS_VM_STOP_TIMEOUT_SECS", default_value_t = 30)]
    pub stop_timeout_secs: u64,

    /// OTLP endpoint for exporting traces.
    #[arg(long, env = "OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Bearer token for the OTLP endpoint.
    #[arg(long, env = "OTLP_TOKEN")]
    pub otlp_token: Option<String>,
}

impl Args {
    pub fn cli_config(&self) -> CliVmConfig {
        CliVmConfig {
            bin: self.vm_bin.clone(),
            header_token: self.header_token.clone(),
            run_flags: self
                .run_flags
                .iter()
                .filter(|f| !f.is_empty())
                .cloned()
                .collect(),
            list_timeout: Duration::from_secs(self.list_timeout_secs),
            stop_timeout: Duration::from_secs(self.stop_timeout_secs),
        }
    }
}
