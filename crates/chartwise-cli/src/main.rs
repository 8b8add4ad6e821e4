use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chartwise_contracts::analysis::{AnalysisOutput, ChartImage, Operation};
use chartwise_contracts::catalog::{PatternCatalog, PatternCatalogEntry};
use chartwise_contracts::chat::{chat_help_lines, parse_intent, ChatAction, SYMBOL_SUGGESTIONS};
use chartwise_contracts::events::{EventKind, EventWriter};
use chartwise_contracts::Locale;
use chartwise_engine::{
    non_empty_env, AnalysisSession, GatewayConfig, GatewayError, ModelGateway, SessionOutcome,
};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(
    name = "chartwise",
    version,
    about = "AI commentary for trading charts and market symbols"
)]
struct Cli {
    /// Language for narrative fields (en or bn).
    #[arg(long, global = true, default_value = "en")]
    lang: Locale,
    /// Append JSONL events to this file.
    #[arg(long, global = true)]
    events: Option<PathBuf>,
    #[arg(long, global = true)]
    vision_model: Option<String>,
    #[arg(long, global = true)]
    text_model: Option<String>,
    /// Pattern catalogue override (JSON array).
    #[arg(long, global = true)]
    patterns: Option<PathBuf>,
    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze a chart screenshot (file path or data: URL).
    Chart { image: String },
    /// Search-grounded analysis of a market symbol.
    Symbol { symbol: String },
    /// Explain a candlestick pattern.
    Explain { pattern: String },
    /// List the pattern catalogue, or show one entry.
    Patterns {
        #[arg(long)]
        id: Option<String>,
    },
    /// Interactive session.
    Chat,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("chartwise error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let catalog_path = cli
        .patterns
        .clone()
        .or_else(|| non_empty_env("CHARTWISE_PATTERNS").map(PathBuf::from));
    let catalog = PatternCatalog::load_or_builtin(catalog_path.as_deref())?;

    if let Command::Patterns { id } = &cli.command {
        return run_patterns(&catalog, id.as_deref(), cli.json);
    }

    let mut config = GatewayConfig::from_env()?;
    if cli.vision_model.is_some() || cli.text_model.is_some() {
        let vision = cli
            .vision_model
            .clone()
            .or_else(|| non_empty_env("CHARTWISE_VISION_MODEL"));
        let text = cli
            .text_model
            .clone()
            .or_else(|| non_empty_env("CHARTWISE_TEXT_MODEL"));
        config = config.route_models(vision.as_deref(), text.as_deref())?;
    }
    for note in &config.routing_notes {
        eprintln!("chartwise warning: {note}");
    }

    let events = cli
        .events
        .as_ref()
        .map(|path| EventWriter::new(path, Uuid::new_v4().to_string()));
    if let Some(events) = events.as_ref() {
        events.emit(
            EventKind::SessionStarted,
            json_object(json!({
                "command": command_name(&cli.command),
                "locale": cli.lang.code(),
                "vision_model": config.models.vision,
                "text_model": config.models.text,
            })),
        )?;
        eprintln!(
            "chartwise: logging events to {} (run {})",
            events.path().display(),
            events.run_id()
        );
    }

    let mut gateway = ModelGateway::from_config(&config).context("failed to build HTTP client")?;
    if let Some(events) = events.clone() {
        gateway = gateway.with_events(events);
    }

    let (operation, result) = match &cli.command {
        Command::Chart { image } => {
            let image = load_chart_image(image)?;
            (
                Operation::ChartAnalysis,
                gateway
                    .analyze_chart(&image, cli.lang)
                    .map(AnalysisOutput::Chart),
            )
        }
        Command::Symbol { symbol } => (
            Operation::SymbolAnalysis,
            gateway
                .analyze_symbol(symbol, cli.lang)
                .map(AnalysisOutput::Pair),
        ),
        Command::Explain { pattern } => {
            let name = display_pattern_name(&catalog, pattern);
            (
                Operation::PatternExplain,
                gateway
                    .explain_pattern(&name, cli.lang)
                    .map(AnalysisOutput::Pattern),
            )
        }
        Command::Chat => {
            let mut session = AnalysisSession::new(Arc::new(gateway), cli.lang);
            if let Some(events) = events {
                session = session.with_events(events);
            }
            run_chat(session, &catalog, cli.json)?;
            return Ok(0);
        }
        Command::Patterns { id } => return run_patterns(&catalog, id.as_deref(), cli.json),
    };

    match result {
        Ok(output) => {
            println!("{}", format_output(&output, cli.json)?);
            Ok(0)
        }
        Err(err) => {
            report_failure(operation, &err);
            Ok(1)
        }
    }
}

fn run_patterns(catalog: &PatternCatalog, id: Option<&str>, as_json: bool) -> Result<i32> {
    let Some(id) = id else {
        if as_json {
            let entries: Vec<&PatternCatalogEntry> = catalog.list().collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        } else {
            for row in pattern_list_lines(catalog) {
                println!("{row}");
            }
        }
        return Ok(0);
    };
    let Some(entry) = catalog.resolve(id) else {
        bail!("unknown pattern '{id}'");
    };
    if as_json {
        println!("{}", serde_json::to_string_pretty(entry)?);
    } else {
        println!("{}", pattern_detail_lines(entry).join("\n"));
    }
    Ok(0)
}

fn run_chat(mut session: AnalysisSession, catalog: &PatternCatalog, as_json: bool) -> Result<()> {
    let stdin = io::stdin();
    let mut line = String::new();

    println!(
        "Chartwise chat started ({}). Type /help for commands.",
        session.locale().short_label()
    );

    loop {
        if let Some(outcome) = session.take_outcome() {
            print_outcome(outcome, as_json)?;
        }
        let marker = if session.is_busy() { "*" } else { "" };
        print!("[{}{marker}]> ", session.locale().code());
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        match parse_intent(input).action {
            ChatAction::Noop => {}
            ChatAction::SetLocale(None) => {
                let locale = session.toggle_locale();
                println!("Language set to {}", locale.short_label());
            }
            ChatAction::SetLocale(Some(code)) => match code.parse::<Locale>() {
                Ok(locale) => {
                    session.set_locale(locale);
                    println!("Language set to {}", locale.short_label());
                }
                Err(message) => println!("{message}"),
            },
            ChatAction::AnalyzeChart(path) => {
                if path.is_empty() {
                    println!("/chart requires a path");
                    continue;
                }
                match load_chart_image(&path) {
                    Ok(image) => announce(session.submit_chart(image), Operation::ChartAnalysis),
                    Err(err) => println!("Chart load failed: {err:#}"),
                }
            }
            ChatAction::AnalyzeSymbol(symbol) => {
                announce(session.submit_symbol(&symbol), Operation::SymbolAnalysis);
            }
            ChatAction::ExplainPattern(name) => {
                if name.is_empty() {
                    println!("/explain requires a pattern name");
                    continue;
                }
                let name = display_pattern_name(catalog, &name);
                announce(session.submit_pattern(&name), Operation::PatternExplain);
            }
            ChatAction::ShowPattern(id) => match catalog.resolve(&id) {
                Some(entry) => println!("{}", pattern_detail_lines(entry).join("\n")),
                None => println!("Unknown pattern '{id}'. Try /patterns."),
            },
            ChatAction::ListPatterns => {
                for row in pattern_list_lines(catalog) {
                    println!("{row}");
                }
            }
            ChatAction::Status => {
                let models = session.gateway().models();
                match session.pending() {
                    Some(operation) => println!("Busy: {}", operation.as_str()),
                    None => println!("Idle"),
                }
                println!(
                    "Language: {} | transport: {} | vision: {} | search: {} | text: {}",
                    session.locale().short_label(),
                    session.gateway().transport_name(),
                    models.vision,
                    models.search,
                    models.text
                );
            }
            ChatAction::Cancel => match session.dismiss() {
                Some(operation) => println!("Dismissed pending {}", operation.as_str()),
                None => println!("Nothing to cancel"),
            },
            ChatAction::Help => {
                println!("Commands: {}", chat_help_lines().join(" "));
                println!("Plain text scans a symbol, e.g. {}", SYMBOL_SUGGESTIONS.join(", "));
            }
            ChatAction::Quit => break,
            ChatAction::Unknown { command, .. } => {
                println!("Unknown command: /{command}. Type /help.");
            }
        }
    }

    if session.is_busy() {
        println!("Waiting for the pending analysis...");
        if let Some(outcome) = session.wait() {
            print_outcome(outcome, as_json)?;
        }
    }
    Ok(())
}

fn announce(submitted: Result<Operation, GatewayError>, operation: Operation) {
    match submitted {
        Ok(operation) => println!(
            "Running {}; the result shows at the next prompt.",
            operation.as_str()
        ),
        Err(err) => println!("{}", err.user_message(operation)),
    }
}

fn print_outcome(outcome: SessionOutcome, as_json: bool) -> Result<()> {
    match outcome.result {
        Ok(output) => println!("{}", format_output(&output, as_json)?),
        Err(err) => report_failure(outcome.operation, &err),
    }
    Ok(())
}

fn report_failure(operation: Operation, err: &GatewayError) {
    println!("{}", err.user_message(operation));
    eprintln!("chartwise: {} failed: {err}", operation.as_str());
}

fn load_chart_image(input: &str) -> Result<ChartImage> {
    let trimmed = input.trim();
    if trimmed.starts_with("data:") {
        return Ok(ChartImage::from_data_url(trimmed));
    }
    let path = Path::new(trimmed);
    let bytes = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
    let format = image::guess_format(&bytes)
        .with_context(|| format!("{} is not a recognised image", path.display()))?;
    Ok(ChartImage::from_bytes(&bytes, format.to_mime_type()))
}

/// Catalogue ids and names resolve to the display name; anything else is
/// sent as typed.
fn display_pattern_name(catalog: &PatternCatalog, input: &str) -> String {
    let trimmed = input.trim();
    catalog
        .resolve(trimmed)
        .map(|entry| entry.name.clone())
        .unwrap_or_else(|| trimmed.to_string())
}

fn format_output(output: &AnalysisOutput, as_json: bool) -> Result<String> {
    if as_json {
        return Ok(serde_json::to_string_pretty(output)?);
    }
    let lines = match output {
        AnalysisOutput::Chart(result) => vec![
            format!(
                "Trend: {} ({}% confidence) [{}]",
                result.trend,
                result.confidence,
                result.trend.color_tag().as_str()
            ),
            format!("Support: {}", join_levels(&result.support_levels)),
            format!("Resistance: {}", join_levels(&result.resistance_levels)),
            format!("Insight: {}", result.insight),
            format!("Zones: {}", result.zones_explanation),
            format!("Disclaimer: {}", result.disclaimer),
        ],
        AnalysisOutput::Pair(result) => vec![
            format!(
                "{}: {} [{}]",
                result.symbol,
                result.trend,
                result.trend.color_tag().as_str()
            ),
            format!("Support: {}", join_or_none(&result.support)),
            format!("Resistance: {}", join_or_none(&result.resistance)),
            format!("Scenario: {}", result.scenario),
            format!("Explanation: {}", result.explanation),
        ],
        AnalysisOutput::Pattern(result) => vec![
            result.name.clone(),
            format!("Meaning: {}", result.meaning),
            format!("Example: {}", result.example),
            format!("Action: {}", result.action),
        ],
    };
    Ok(lines.join("\n"))
}

fn join_levels(levels: &[f64]) -> String {
    let rendered: Vec<String> = levels.iter().map(|level| level.to_string()).collect();
    join_or_none(&rendered)
}

fn join_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "none".to_string()
    } else {
        values.join(", ")
    }
}

fn pattern_list_lines(catalog: &PatternCatalog) -> Vec<String> {
    catalog
        .list()
        .map(|entry| format!("{:<18} {:<20} {}", entry.id, entry.name, entry.category))
        .collect()
}

fn pattern_detail_lines(entry: &PatternCatalogEntry) -> Vec<String> {
    vec![
        format!("{} ({})", entry.name, entry.category),
        entry.description.clone(),
        format!("Meaning: {}", entry.details.meaning),
        format!("Example: {}", entry.details.example),
        format!("Action: {}", entry.details.action),
        format!("Stop loss: {}", entry.details.stop_loss),
        format!("Bias: {}", entry.bias()),
        format!("Tutorial: {}", entry.video_embed_url()),
    ]
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Chart { .. } => "chart",
        Command::Symbol { .. } => "symbol",
        Command::Explain { .. } => "explain",
        Command::Patterns { .. } => "patterns",
        Command::Chat => "chat",
    }
}

fn json_object(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chartwise_contracts::analysis::{
        AnalysisOutput, AnalysisResult, PairAnalysisResult, Trend,
    };
    use chartwise_contracts::catalog::PatternCatalog;
    use clap::Parser;

    use super::{
        display_pattern_name, format_output, load_chart_image, pattern_detail_lines,
        pattern_list_lines, Cli, Command,
    };
    use chartwise_contracts::Locale;

    #[test]
    fn cli_parses_global_flags_after_subcommand() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["chartwise", "symbol", "btcusd", "--lang", "bn", "--json"])?;
        assert_eq!(cli.lang, Locale::Bangla);
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Symbol { ref symbol } if symbol == "btcusd"));

        let cli = Cli::try_parse_from(["chartwise", "patterns", "--id", "doji"])?;
        assert_eq!(cli.lang, Locale::English);
        assert!(matches!(cli.command, Command::Patterns { id: Some(ref id) } if id == "doji"));

        assert!(Cli::try_parse_from(["chartwise", "--lang", "fr", "chat"]).is_err());
        Ok(())
    }

    #[test]
    fn chart_files_are_typed_from_their_bytes() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let png = temp.path().join("chart.bin");
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        fs::write(&png, &bytes)?;
        let image = load_chart_image(&png.to_string_lossy())?;
        assert_eq!(image.mime_type(), "image/png");
        assert!(!image.is_empty());

        let text = temp.path().join("notes.txt");
        fs::write(&text, "not a chart")?;
        assert!(load_chart_image(&text.to_string_lossy()).is_err());
        Ok(())
    }

    #[test]
    fn data_urls_bypass_the_filesystem() -> anyhow::Result<()> {
        let image = load_chart_image(" data:image/jpeg;base64,/9j/4AAQ ")?;
        assert_eq!(image.mime_type(), "image/jpeg");
        assert_eq!(image.data(), "/9j/4AAQ");
        Ok(())
    }

    #[test]
    fn pattern_names_resolve_through_the_catalogue() -> anyhow::Result<()> {
        let catalog = PatternCatalog::builtin()?;
        assert_eq!(display_pattern_name(&catalog, "hammer"), "Hammer");
        assert_eq!(display_pattern_name(&catalog, " Three White Soldiers "), "Three White Soldiers");
        assert_eq!(pattern_list_lines(&catalog).len(), catalog.len());
        Ok(())
    }

    #[test]
    fn pattern_details_include_tutorial_link() -> anyhow::Result<()> {
        let catalog = PatternCatalog::builtin()?;
        let Some(entry) = catalog.get("doji") else {
            panic!("doji is bundled");
        };
        let lines = pattern_detail_lines(entry);
        assert!(lines[0].starts_with(&entry.name));
        assert!(lines
            .iter()
            .any(|line| line.starts_with("Tutorial: https://www.youtube.com/embed/")));
        Ok(())
    }

    #[test]
    fn human_output_lists_levels() -> anyhow::Result<()> {
        let chart = AnalysisOutput::Chart(AnalysisResult {
            trend: Trend::Bullish,
            confidence: 72,
            support_levels: vec![100.0, 98.5],
            resistance_levels: Vec::new(),
            insight: "x".to_string(),
            zones_explanation: "y".to_string(),
            disclaimer: "z".to_string(),
        });
        let text = format_output(&chart, false)?;
        assert!(text.starts_with("Trend: Bullish (72% confidence) [emerald]"));
        assert!(text.contains("Support: 100, 98.5"));
        assert!(text.contains("Resistance: none"));

        let pair = AnalysisOutput::Pair(PairAnalysisResult {
            symbol: "EURUSD".to_string(),
            trend: Trend::Sideways,
            support: vec!["1.08".to_string()],
            resistance: vec!["1.10".to_string()],
            scenario: "range".to_string(),
            explanation: "quiet".to_string(),
        });
        assert!(format_output(&pair, false)?.starts_with("EURUSD: Sideways [yellow]"));
        let json: serde_json::Value = serde_json::from_str(&format_output(&pair, true)?)?;
        assert_eq!(json["kind"], "pair");
        assert_eq!(json["result"]["symbol"], "EURUSD");
        Ok(())
    }
}
