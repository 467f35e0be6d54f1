use clap::{Parser, ValueEnum};
use vigil_gitlab::{AccessLevel, DEFAULT_GITLAB_API_BASE};
use vigil_maintainers::{DEFAULT_JOB_SCOPES, DEFAULT_LOOKBACK_DAYS, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

fn parse_positive_u32(value: &str) -> Result<u32, String> {
    let parsed = value
        .parse::<u32>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_page_size(value: &str) -> Result<u32, String> {
    let parsed = parse_positive_u32(value)?;
    if parsed > MAX_PAGE_SIZE {
        return Err(format!("value must be in range 1..={MAX_PAGE_SIZE}"));
    }
    Ok(parsed)
}

fn parse_access_level(value: &str) -> Result<AccessLevel, String> {
    value.parse::<AccessLevel>().map_err(|error| error.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum CliReportFormat {
    Json,
    Text,
}

#[derive(Debug, Parser)]
#[command(
    name = "vigil-maintainers",
    about = "Reports which privileged members of a GitLab project were recently active",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long,
        env = "VIGIL_PROJECT",
        help = "Project path (group/name) or numeric project id"
    )]
    pub project: String,

    #[arg(
        long = "gitlab-api-base",
        env = "GITLAB_API_BASE",
        default_value = DEFAULT_GITLAB_API_BASE,
        help = "Base URL of the GitLab REST API"
    )]
    pub gitlab_api_base: String,

    #[arg(
        long = "gitlab-token",
        env = "GITLAB_AUTH_TOKEN",
        hide_env_values = true,
        help = "Access token sent as PRIVATE-TOKEN; omit for public projects"
    )]
    pub gitlab_token: Option<String>,

    #[arg(
        long = "lookback-days",
        env = "VIGIL_LOOKBACK_DAYS",
        default_value_t = DEFAULT_LOOKBACK_DAYS,
        value_parser = parse_positive_u32,
        help = "Activity strictly after now minus this many days counts as recent"
    )]
    pub lookback_days: u32,

    #[arg(
        long = "min-access-level",
        env = "VIGIL_MIN_ACCESS_LEVEL",
        default_value = "developer",
        value_parser = parse_access_level,
        help = "Lowest access level treated as privileged (name or numeric ordinal)"
    )]
    pub min_access_level: AccessLevel,

    #[arg(
        long = "page-size",
        env = "VIGIL_PAGE_SIZE",
        default_value_t = DEFAULT_PAGE_SIZE,
        value_parser = parse_page_size,
        help = "Records requested per page (1..=100)"
    )]
    pub page_size: u32,

    #[arg(
        long = "request-timeout-ms",
        env = "VIGIL_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Timeout for each GitLab API request"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "VIGIL_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        help = "Attempts per request for retryable statuses and transport errors"
    )]
    pub retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "VIGIL_RETRY_BASE_DELAY_MS",
        default_value_t = 200,
        help = "Base delay for exponential retry backoff"
    )]
    pub retry_base_delay_ms: u64,

    #[arg(
        long = "job-scope",
        env = "VIGIL_JOB_SCOPES",
        value_delimiter = ',',
        help = "CI job status scope used when scanning pipeline jobs (repeatable)"
    )]
    pub job_scope: Vec<String>,

    #[arg(
        long,
        env = "VIGIL_FORMAT",
        value_enum,
        default_value_t = CliReportFormat::Json,
        help = "Report format written to stdout"
    )]
    pub format: CliReportFormat,
}

impl Cli {
    pub(crate) fn job_scopes(&self) -> Vec<String> {
        if self.job_scope.is_empty() {
            return DEFAULT_JOB_SCOPES
                .iter()
                .map(|scope| scope.to_string())
                .collect();
        }
        self.job_scope.clone()
    }
}
