//! CLI subcommand handlers.

use crate::{Commands, ConfigAction, IdeaArgs};
use anyhow::Context;
use ideacheck_core::citations::CitationReport;
use ideacheck_core::config::{load_config, render_toml, user_config_path, workspace_config_path};
use ideacheck_core::gateway::{GatewayServer, run_gateway};
use ideacheck_core::report::{render_citation_report, render_report, render_suggestions};
use ideacheck_core::{
    AnalysisResult, AppConfig, FlowError, FormVariant, IdeaForm, Orchestrator, Session,
    verify_citations,
};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Global flags that override the loaded configuration.
#[derive(Debug, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub provider: Option<String>,
}

impl Overrides {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(provider) = &self.provider {
            config.llm.provider = provider.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
    }
}

/// Options of the `analyze` subcommand that shape the flow sequence.
#[derive(Debug, Default)]
pub(crate) struct AnalyzeOptions {
    pub keywords: Option<String>,
    pub auto_keywords: bool,
    pub quick: bool,
    pub refine: bool,
}

/// Everything one `analyze` run produced.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnalysisRun {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    pub result: AnalysisResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refined_suggestions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations: Option<CitationReport>,
}

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    overrides: &Overrides,
) -> anyhow::Result<()> {
    match command {
        Commands::Serve { host, port, cors } => {
            let mut config = load(workspace, overrides)?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.server.cors_permissive |= cors;
            handle_serve(config).await
        }
        Commands::Keywords { idea, json } => {
            let config = load(workspace, overrides)?;
            let idea = read_idea(&idea)?;
            handle_keywords(orchestrator(&config)?, &idea, json).await
        }
        Commands::Analyze {
            idea,
            keywords,
            auto_keywords,
            quick,
            refine,
            verify_links,
            json,
        } => {
            let config = load(workspace, overrides)?;
            let idea = read_idea(&idea)?;
            let options = AnalyzeOptions {
                keywords,
                auto_keywords,
                quick,
                refine,
            };
            let mut run = run_analysis(orchestrator(&config)?, &idea, &options).await?;
            if verify_links {
                let mut citations = config.citations.clone();
                citations.enabled = true;
                let report = verify_citations(
                    &citations,
                    &run.result.patentability_analysis.cited_resources,
                )
                .await?;
                run.citations = Some(report);
            }
            print_analysis(&run, json)
        }
        Commands::Suggest {
            idea,
            analysis,
            analysis_file,
            keywords,
            json,
        } => {
            let config = load(workspace, overrides)?;
            let idea = read_idea(&idea)?;
            let analysis = match (analysis, analysis_file) {
                (Some(text), _) => text,
                (None, Some(path)) => read_file(&path)?,
                (None, None) => anyhow::bail!("Provide --analysis or --analysis-file"),
            };
            let output = orchestrator(&config)?
                .suggest(&idea, &analysis, &keywords)
                .await
                .context("Suggestion refinement failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print!("{}", render_suggestions(&output.suggestions));
            }
            Ok(())
        }
        Commands::Config { action } => handle_config(action, workspace, overrides),
    }
}

fn load(workspace: &Path, overrides: &Overrides) -> anyhow::Result<AppConfig> {
    let mut config = load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn orchestrator(config: &AppConfig) -> anyhow::Result<Orchestrator> {
    Orchestrator::from_config(config).with_context(|| {
        format!(
            "Failed to initialize {} provider for model '{}'",
            config.llm.provider, config.llm.model
        )
    })
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Resolve the idea description from an argument, a file, or stdin.
fn read_idea(args: &IdeaArgs) -> anyhow::Result<String> {
    let text = match (&args.idea, &args.file) {
        (_, Some(path)) => read_file(path)?,
        (Some(idea), None) if idea == "-" => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read idea description from stdin")?;
            buf
        }
        (Some(idea), None) => idea.clone(),
        (None, None) => anyhow::bail!("Provide an idea description, --file, or `-` for stdin"),
    };
    Ok(text.trim().to_string())
}

/// Attach the user-facing notice to an invocation failure.
fn failure(session: &Session, err: FlowError) -> anyhow::Error {
    match session.notice() {
        Some(notice) if err.is_invocation() => anyhow::Error::new(err).context(notice.to_string()),
        _ => err.into(),
    }
}

async fn handle_serve(config: AppConfig) -> anyhow::Result<()> {
    let orchestrator = orchestrator(&config)?;
    info!(
        provider = orchestrator.provider().provider_name(),
        model = orchestrator.provider().model_name(),
        "Starting gateway"
    );
    let gw = GatewayServer::new(config.server.clone(), orchestrator, config.citations.clone())
        .shared();
    run_gateway(gw).await.context("Gateway failed")
}

async fn handle_keywords(orchestrator: Orchestrator, idea: &str, json: bool) -> anyhow::Result<()> {
    let mut session = Session::new(orchestrator);
    let outcome = session.generate_keywords(idea).await.map(str::to_string);
    let keywords = outcome.map_err(|e| failure(&session, e))?;
    if json {
        println!("{}", serde_json::json!({ "keywords": keywords }));
    } else {
        println!("{keywords}");
    }
    Ok(())
}

/// Run keyword generation (when asked), the analysis and optional refinement.
pub(crate) async fn run_analysis(
    orchestrator: Orchestrator,
    idea: &str,
    options: &AnalyzeOptions,
) -> anyhow::Result<AnalysisRun> {
    let mut keywords = if options.quick {
        None
    } else {
        options
            .keywords
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    };
    if options.refine && keywords.is_none() && !options.auto_keywords {
        anyhow::bail!("--refine needs keywords: pass --keywords or --auto-keywords");
    }

    let mut session = Session::new(orchestrator.clone());
    if keywords.is_none() && options.auto_keywords {
        let outcome = session.generate_keywords(idea).await.map(str::to_string);
        keywords = Some(outcome.map_err(|e| failure(&session, e))?);
    }

    let variant = if keywords.is_some() {
        FormVariant::KeywordForm
    } else {
        FormVariant::QuickCheck
    };
    let form = IdeaForm {
        idea_description: idea.to_string(),
        keywords: keywords.clone(),
    };
    let outcome = session.submit(variant, &form).await.cloned();
    let result = outcome.map_err(|e| failure(&session, e))?;

    let refined_suggestions = match (&keywords, options.refine) {
        (Some(k), true) => Some(
            orchestrator
                .refine(idea, &result, k)
                .await
                .context("Suggestion refinement failed")?
                .suggestions,
        ),
        _ => None,
    };

    Ok(AnalysisRun {
        keywords,
        result,
        refined_suggestions,
        citations: None,
    })
}

fn print_analysis(run: &AnalysisRun, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(run)?);
        return Ok(());
    }
    if let Some(keywords) = &run.keywords {
        println!("Keywords: {keywords}\n");
    }
    print!("{}", render_report(&run.result));
    if let Some(suggestions) = &run.refined_suggestions {
        println!();
        print!("{}", render_suggestions(suggestions));
    }
    if let Some(report) = &run.citations {
        println!();
        print!("{}", render_citation_report(report));
    }
    Ok(())
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    overrides: &Overrides,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(dir) = config_path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(&config_path, render_toml(&AppConfig::default())?)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load(workspace, overrides)?;
            println!("{}", render_toml(&config)?);
            Ok(())
        }
        ConfigAction::Path => {
            let user = user_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(no home directory)".to_string());
            println!("user:      {user}");
            println!("workspace: {}", workspace_config_path(workspace).display());
            Ok(())
        }
    }
}
