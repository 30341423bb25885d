use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use hexorcist::llm::{
    CodeAssistant, Credential, LlmClient, LlmError, LlmProvider, PromptRequest, ProviderConfig,
    RetryEvent, TaskKind, TaskOutput,
};
use hexorcist::output::{render_source_block, write_markdown};
use hexorcist::settings::{AppConfig, resolve_credential};

#[derive(Parser)]
#[command(name = "hexorcist")]
#[command(about = "🔧 Hexorcist - LLM assistant for embedded firmware development")]
#[command(long_about = "Hexorcist asks an LLM provider of your choice to generate embedded source code,
suggest step-by-step development guidance, or write test cases for your firmware.

Supported providers: google, openai, azure, mistral, anthropic, ollama.
API keys are read from --api-key or the provider's environment variable
(GOOGLE_API_KEY, OPENAI_API_KEY, AZURE_API_KEY, MISTRAL_API_KEY, ANTHROPIC_API_KEY).")]
#[command(version)]
#[command(after_help = "EXAMPLES:
    hexorcist code -l \"Embedded C\" -w \"STM32F407\" -d \"Blink PD12 every 500 ms\"
    hexorcist guidance -l \"Embedded C\" -w \"STM32F407\" --code-file main.c
    hexorcist --provider ollama test-cases -l Rust -w nRF52840 --code-file src/main.rs
    hexorcist config --provider mistral --model mistral-small-latest")]
struct Cli {
    /// Provider for this run (overrides the saved configuration)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model for this run (overrides the saved configuration)
    #[arg(long, global = true)]
    model: Option<String>,

    /// API key for this run; never written to disk
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Use this configuration file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 🧩 Generate source code, documentation and optimization tips
    #[command(alias = "generate", alias = "gen")]
    #[command(long_about = "Generate production-ready embedded source code for the target hardware.

The result contains the source code, its documentation and a list of optimization
recommendations. Documentation and recommendations are printed as markdown.

EXAMPLES:
    hexorcist code -l \"Embedded C\" -w \"STM32F407\" -d \"Toggle PD12 from a TIM2 interrupt\"
    hexorcist gen -l MicroPython -w \"ESP32\" -d \"Read a DHT22 every 2 s\" -o esp32.md")]
    Code(TaskArgs),

    /// 🧭 Suggest step-by-step guidance for existing code
    #[command(alias = "guide")]
    Guidance(TaskArgs),

    /// 🧪 Generate test cases for existing code
    #[command(alias = "tests")]
    TestCases(TaskArgs),

    /// ⚙️ Show or update the saved provider settings
    #[command(long_about = "Show or update the saved provider settings.

Without options the current configuration is printed. API keys are never stored.

EXAMPLES:
    hexorcist config
    hexorcist config --provider anthropic
    hexorcist config --provider azure --endpoint https://fw.openai.azure.com --api-version 2024-02-01 --deployment gpt4o
    hexorcist config --max-attempts 5")]
    Config(ConfigArgs),
}

#[derive(Args)]
struct TaskArgs {
    /// Programming language, e.g. "Embedded C", "Rust", "MicroPython"
    #[arg(short, long)]
    language: String,

    /// Target hardware, e.g. "STM32F407 Discovery"
    #[arg(short = 'w', long)]
    hardware: String,

    /// What the application should do
    #[arg(short, long, default_value = "")]
    description: String,

    /// Existing source code to include in the prompt
    #[arg(short, long, value_name = "FILE")]
    code_file: Option<PathBuf>,

    /// Write the markdown result to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ConfigArgs {
    /// Custom base URL (proxies, self-hosted Ollama)
    #[arg(long)]
    base_url: Option<String>,

    /// Azure OpenAI resource endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Azure OpenAI API version
    #[arg(long)]
    api_version: Option<String>,

    /// Azure OpenAI deployment name
    #[arg(long)]
    deployment: Option<String>,

    /// Attempts per task before giving up
    #[arg(long)]
    max_attempts: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Retry progress reaches the user through `report_retry`; RUST_LOG opts into the core's logs.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "off".into()),
        )
        .init();

    let cli = Cli::parse();
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => AppConfig::config_file_path()?,
    };

    match cli.command {
        Commands::Config(ref args) => run_config(&cli, args, &config_path),
        Commands::Code(ref args) => run_task(&cli, TaskKind::CodeGeneration, args, &config_path).await,
        Commands::Guidance(ref args) => run_task(&cli, TaskKind::Guidance, args, &config_path).await,
        Commands::TestCases(ref args) => run_task(&cli, TaskKind::TestCases, args, &config_path).await,
    }
}

/// `--provider` and `--model` are the global flags; here they update the saved defaults.
fn run_config(cli: &Cli, args: &ConfigArgs, path: &Path) -> Result<()> {
    let mut config = AppConfig::load_from(path)?;

    let updating = cli.provider.is_some()
        || cli.model.is_some()
        || args.base_url.is_some()
        || args.endpoint.is_some()
        || args.api_version.is_some()
        || args.deployment.is_some()
        || args.max_attempts.is_some();

    if updating {
        if let Some(provider) = &cli.provider {
            config.set_provider(provider.parse()?);
        }
        if let Some(model) = &cli.model {
            config.model = Some(model.clone());
        }
        if let Some(base_url) = &args.base_url {
            config.base_url = Some(base_url.clone());
        }
        if let Some(endpoint) = &args.endpoint {
            config.endpoint = Some(endpoint.clone());
        }
        if let Some(api_version) = &args.api_version {
            config.api_version = Some(api_version.clone());
        }
        if let Some(deployment) = &args.deployment {
            config.deployment_name = Some(deployment.clone());
        }
        if let Some(max_attempts) = args.max_attempts {
            config.max_attempts = max_attempts;
        }

        config
            .save_to(path)
            .with_context(|| format!("failed to save configuration to {}", path.display()))?;
        println!("✅ Configuration saved to {}", path.display());
    }

    print_config(&config, path);
    Ok(())
}

fn print_config(config: &AppConfig, path: &Path) {
    let provider_config = config.provider_config();

    println!("Current configuration ({}):", path.display());
    println!("  provider:     {}", config.provider);
    println!("  model:        {}", display_or_unset(Some(provider_config.model.as_str())));
    println!("  base_url:     {}", provider_config.resolved_base_url());
    if config.provider == LlmProvider::AzureOpenAi {
        println!("  endpoint:     {}", display_or_unset(config.endpoint.as_deref()));
        println!("  api_version:  {}", display_or_unset(config.api_version.as_deref()));
        println!("  deployment:   {}", display_or_unset(config.deployment_name.as_deref()));
    }
    println!("  max_attempts: {}", config.max_attempts);

    match config.provider.api_key_env_var() {
        Some(var) => {
            let present = std::env::var(var).map(|v| !v.trim().is_empty()).unwrap_or(false);
            let status = if present { "set" } else { "not set" };
            println!("  api key:      ${} ({})", var, status);
        }
        None => println!("  api key:      not required"),
    }

    for warning in config.validate() {
        println!("⚠️  {}", warning);
    }
}

fn display_or_unset(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => "(unset)",
    }
}

async fn run_task(cli: &Cli, task: TaskKind, args: &TaskArgs, config_path: &Path) -> Result<()> {
    let mut app_config = AppConfig::load_from(config_path)?;
    if let Some(provider) = &cli.provider {
        app_config.set_provider(provider.parse()?);
    }
    if let Some(model) = &cli.model {
        app_config.model = Some(model.clone());
    }

    let provider_config: ProviderConfig = app_config.provider_config();
    let credential: Credential = resolve_credential(app_config.provider, cli.api_key.as_deref());

    let existing_code = match &args.code_file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => String::new(),
    };

    let request = PromptRequest::new(
        task,
        args.language.as_str(),
        args.hardware.as_str(),
        args.description.as_str(),
        existing_code,
    );

    let client = LlmClient::new()?;
    let assistant = CodeAssistant::new(client, app_config.retry_config());

    eprintln!(
        "🤖 Asking {} ({}) ...",
        provider_config.provider,
        display_or_unset(Some(provider_config.model.as_str()))
    );

    let result = assistant
        .run(&request, &provider_config, &credential, report_retry)
        .await;

    let output = match result {
        Ok(output) => output,
        Err(err) => {
            report_failure(&err);
            std::process::exit(1);
        }
    };

    let document = match output {
        TaskOutput::Code(code) => {
            let mut document = render_source_block(&request.language_type, &code.result.source_code);
            document.push('\n');
            document.push_str(&code.markdown);
            document
        }
        TaskOutput::Text(text) => text,
    };

    match &args.output {
        Some(path) => {
            write_markdown(path, &document).await?;
            eprintln!("✅ Saved to {}", path.display());
        }
        None => println!("{}", document),
    }

    Ok(())
}

fn report_retry(event: RetryEvent<'_>) {
    match event {
        RetryEvent::Transient { .. } => eprintln!("⚠️  {}", event),
        RetryEvent::Exhausted { .. } => eprintln!("❌ {}", event),
    }
}

/// Final error line. Exhaustion was already announced by `report_retry`.
fn report_failure(err: &LlmError) {
    if !matches!(err, LlmError::RetryExhausted { .. }) {
        eprintln!("❌ {}", err);
    }
    if let LlmError::Configuration { .. } = err {
        eprintln!("💡 Run 'hexorcist config' to review your settings.");
    }
    if let Some(raw) = err.raw_output() {
        eprintln!("   Raw model output:");
        eprintln!("{}", raw);
    }
}
