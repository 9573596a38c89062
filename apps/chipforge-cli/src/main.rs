use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chipforge_check::{check_spacing, validate, ParamViolation, PlacedFootprint, SpacingViolation};
use chipforge_core::{ComponentPort, Point, TemplateError};
use chipforge_io::{FeatureDocument, FeatureInstance, IoError};
use chipforge_library::{Template, TemplateRegistry};
use chipforge_render::render_document;
use clap::{Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "chipforge", version, about = "Parametric microfluidic feature templates")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the registered templates
    List,

    /// Print a template's parameter schema
    Schema {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Render every feature of a document into polygons
    Render {
        #[arg(value_name = "DOC")]
        document: PathBuf,

        /// Draw placement previews instead of final geometry
        #[arg(long)]
        preview: bool,
    },

    /// Print the placed ports of every feature
    Ports {
        #[arg(value_name = "DOC")]
        document: PathBuf,
    },

    /// Check parameter bounds and component spacing
    Check {
        #[arg(value_name = "DOC")]
        document: PathBuf,
    },

    /// Place a new feature, creating the document if needed
    New {
        /// Template name, e.g. "YTREE"
        #[arg(value_name = "NAME")]
        template: String,

        #[arg(value_name = "OUT")]
        output: PathBuf,

        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        x: f64,

        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        y: f64,
    },
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error("Cannot write output: {0}")]
    Output(#[from] serde_json::Error),
}

// ── Output records ──────────────────────────────────────────────────

#[derive(Serialize)]
struct TemplateSummary<'a> {
    name: &'a str,
    placement_tool: &'a str,
    render_layers: Vec<&'a str>,
}

#[derive(Serialize)]
struct FeaturePorts<'a> {
    feature: &'a str,
    template: &'a str,
    ports: Vec<ComponentPort>,
}

#[derive(Serialize)]
struct FeatureViolations<'a> {
    feature: &'a str,
    violations: Vec<ParamViolation>,
}

#[derive(Serialize)]
struct CheckReport<'a> {
    parameters: Vec<FeatureViolations<'a>>,
    spacing: Vec<SpacingViolation>,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Attach the feature name to template failures.
fn in_feature<T>(instance: &FeatureInstance, result: Result<T, TemplateError>) -> Result<T, CliError> {
    result.map_err(|source| {
        IoError::Feature {
            feature: instance.name.clone(),
            source,
        }
        .into()
    })
}

// ── Commands ────────────────────────────────────────────────────────

fn list(registry: &TemplateRegistry) -> Result<(), CliError> {
    let summaries: Vec<TemplateSummary> = registry
        .iter()
        .map(|t| TemplateSummary {
            name: t.canonical_name(),
            placement_tool: t.schema().placement_tool().as_str(),
            render_layers: t.schema().render_layers().iter().map(|l| l.as_str()).collect(),
        })
        .collect();
    print_json(&summaries)
}

fn ports(registry: &TemplateRegistry, document: &FeatureDocument) -> Result<(), CliError> {
    let mut out = Vec::with_capacity(document.features.len());
    for instance in &document.features {
        let template = instance.resolve(registry)?;
        let placement = in_feature(instance, template.placement(&instance.params))?;
        let ports = in_feature(instance, template.ports(&instance.params))?
            .iter()
            .map(|p| p.placed(&placement))
            .collect();
        out.push(FeaturePorts {
            feature: &instance.name,
            template: template.canonical_name(),
            ports,
        });
    }
    print_json(&out)
}

fn check(registry: &TemplateRegistry, document: &FeatureDocument) -> Result<(), CliError> {
    let mut parameters = Vec::new();
    let mut footprints = Vec::new();
    for instance in &document.features {
        let template = instance.resolve(registry)?;
        let violations = validate(template.schema(), &instance.params);
        if !violations.is_empty() {
            log::warn!("'{}' has {} parameter violations", instance.name, violations.len());
            parameters.push(FeatureViolations {
                feature: &instance.name,
                violations,
            });
            continue;
        }
        if let Some(bbox) = in_feature(instance, template.footprint(&instance.params))? {
            let spacing = instance.params.float("componentSpacing").unwrap_or(0.0);
            footprints.push((instance.name.as_str(), PlacedFootprint { bbox, spacing }));
        }
    }

    let boxes: Vec<PlacedFootprint> = footprints.iter().map(|(_, f)| *f).collect();
    let mut spacing = check_spacing(&boxes);
    for violation in &mut spacing {
        let (a, b) = violation.features;
        violation.message = format!(
            "'{}' and '{}' are closer than their component spacing",
            footprints[a].0, footprints[b].0
        );
    }
    print_json(&CheckReport { parameters, spacing })
}

fn new_feature(
    registry: &TemplateRegistry,
    template_name: &str,
    output: &Path,
    position: Point,
) -> Result<(), CliError> {
    let template: &dyn Template = registry.resolve(template_name)?;
    let mut document = if output.exists() {
        FeatureDocument::load(output)?
    } else {
        let name = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string());
        FeatureDocument::new(&name)
    };

    let name = format!("{} {}", template.canonical_name(), document.features.len() + 1);
    let instance = FeatureInstance::place(template, &name, position);
    print_json(&instance)?;
    document.add(instance);
    document.save(output)?;
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    let registry = TemplateRegistry::standard()?;
    match cli.command {
        Command::List => list(&registry),
        Command::Schema { name } => print_json(registry.resolve(&name)?.schema()),
        Command::Render { document, preview } => {
            let document = FeatureDocument::load(&document)?;
            print_json(&render_document(&document, &registry, preview)?)
        }
        Command::Ports { document } => ports(&registry, &FeatureDocument::load(&document)?),
        Command::Check { document } => check(&registry, &FeatureDocument::load(&document)?),
        Command::New { template, output, x, y } => {
            new_feature(&registry, &template, &output, Point::new(x, y))
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
