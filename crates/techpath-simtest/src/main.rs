//! TechPath Headless Simulation Harness
//!
//! Validates the shipped technology tree and runs both simulators over it.
//! Runs entirely in-process: no network, no rendering.
//!
//! Usage:
//!   cargo run -p techpath-simtest
//!   cargo run -p techpath-simtest -- --verbose
//!   cargo run -p techpath-simtest -- --config overrides.json --json
//!
//! `RUST_LOG=debug` surfaces the engine's own logging.

use std::collections::HashSet;

use serde::Serialize;
use techpath_logic::config::SimulationConfig;
use techpath_logic::graph::{GraphData, NodeType, TechGraph};
use techpath_logic::outlook::{self, EnablingAssessment, PathwayOutlook, Priority};
use techpath_logic::scheduler::{ImpactSummary, YearlyScheduler};
use techpath_logic::state::{Snapshot, TechStatus};
use techpath_logic::strategic::{InvestmentOption, StrategicSimulator};

// ── Technology tree (same JSON the dashboard uses) ──────────────────────
const TECH_TREE_JSON: &str = include_str!("../../../data/tech_tree.json");

const SCHEDULER_YEARS: u32 = 15;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn check(name: &str, passed: bool, detail: String) -> Self {
        Self {
            name: name.into(),
            passed,
            detail,
        }
    }
}

/// Machine-readable output for `--json`.
#[derive(Serialize)]
struct Report {
    summary: ImpactSummary,
    ranking: Vec<InvestmentOption>,
    pathways: Vec<PathwayOutlook>,
    enabling: Vec<EnablingAssessment>,
}

struct Args {
    verbose: bool,
    json: bool,
    config_path: Option<String>,
}

fn parse_args(mut iter: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut args = Args {
        verbose: false,
        json: false,
        config_path: None,
    };
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--verbose" | "-v" => args.verbose = true,
            "--json" => args.json = true,
            "--config" => match iter.next() {
                Some(path) => args.config_path = Some(path),
                None => return Err("--config requires a path".to_string()),
            },
            other => eprintln!("ignoring unknown argument {}", other),
        }
    }
    Ok(args)
}

fn load_config(path: Option<&str>) -> Result<SimulationConfig, String> {
    let config = match path {
        Some(p) => {
            let raw = std::fs::read_to_string(p).map_err(|e| format!("{}: {}", p, e))?;
            serde_json::from_str::<SimulationConfig>(&raw).map_err(|e| format!("{}: {}", p, e))?
        }
        None => SimulationConfig::default(),
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() {
    env_logger::init();
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(a) => a,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(2);
        }
    };

    let config = match load_config(args.config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };
    log::info!(
        "Simulating from {} at {:.0}% discount",
        config.start_year,
        config.discount_rate * 100.0
    );

    if !args.json {
        println!("=== TechPath Simulation Harness ===\n");
    }

    let mut results = Vec::new();

    // 1. Dataset validation
    let graph = match load_graph(&mut results, args.json) {
        Some(g) => g,
        None => {
            report(&results, args.verbose, args.json);
            std::process::exit(1);
        }
    };

    // 2. Seeded state
    results.extend(validate_seed(&graph, &config, args.json));

    // 3. Year-by-year scheduler
    let (scheduler_results, summary) = validate_scheduler(&graph, &config, args.json);
    results.extend(scheduler_results);

    // 4. Strategic ranking
    let (strategic_results, ranking) = validate_strategic(&graph, &config, args.json);
    results.extend(strategic_results);

    // 5. Pathway outlook
    let pathways = outlook::pathway_outlooks(&graph, &config, 0.0, None);
    let enabling = outlook::enabling_assessments(&graph, &config, 0.0);
    results.extend(validate_outlook(&graph, &pathways, &enabling, args.json));

    if args.json {
        let out = Report {
            summary,
            ranking,
            pathways,
            enabling,
        };
        match serde_json::to_string_pretty(&out) {
            Ok(s) => println!("{}", s),
            Err(e) => log::error!("Could not serialize report: {}", e),
        }
    } else {
        print_ranking(&ranking, args.verbose);
    }

    let failed = report(&results, args.verbose, args.json);
    if failed > 0 {
        std::process::exit(1);
    }
}

/// Print failures (and passes when verbose); return the failure count.
/// With `--json` the report goes to stderr so stdout stays parseable.
fn report(results: &[TestResult], verbose: bool, json: bool) -> usize {
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    let mut out = String::new();
    for r in results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            out.push_str(&format!("  {} {}: {}\n", icon, r.name, r.detail));
        }
    }
    out.push_str(&format!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed,
        results.len(),
        failed
    ));

    if json {
        eprintln!("{}", out);
    } else {
        println!("\n{}", out);
    }
    failed
}

// ── 1. Dataset ──────────────────────────────────────────────────────────

fn load_graph(results: &mut Vec<TestResult>, quiet: bool) -> Option<TechGraph> {
    if !quiet {
        println!("--- Technology Tree ---");
    }

    let data: GraphData = match serde_json::from_str(TECH_TREE_JSON) {
        Ok(d) => d,
        Err(e) => {
            results.push(TestResult::check(
                "tree_parse",
                false,
                format!("JSON parse error: {}", e),
            ));
            return None;
        }
    };

    // Dangling edge references are dropped by the graph, so count them here
    let ids: HashSet<&str> = data.nodes.iter().map(|n| n.id.as_str()).collect();
    let ids = &ids;
    let dangling: Vec<String> = data
        .edges
        .iter()
        .flat_map(|e| {
            let source = e.source.as_str();
            e.target_ids()
                .into_iter()
                .filter(move |t| !ids.contains(source) || !ids.contains(t))
                .map(move |t| format!("{} -> {}", source, t))
        })
        .collect();
    results.push(TestResult::check(
        "tree_edges_resolve",
        dangling.is_empty(),
        if dangling.is_empty() {
            format!("{} edges, all endpoints known", data.edges.len())
        } else {
            format!("{} dangling: {}", dangling.len(), dangling.join(", "))
        },
    ));

    let graph = match TechGraph::new(data) {
        Ok(g) => g,
        Err(e) => {
            results.push(TestResult::check("tree_build", false, e.to_string()));
            return None;
        }
    };

    let count = |t: NodeType| graph.nodes().iter().filter(|n| n.node_type == t).count();
    let concepts = count(NodeType::ReactorConcept);
    results.push(TestResult::check(
        "tree_has_all_roles",
        concepts > 0 && count(NodeType::Milestone) > 0 && count(NodeType::EnablingTechnology) > 0,
        format!(
            "{} nodes: {} concepts, {} milestones, {} enabling technologies",
            graph.len(),
            concepts,
            count(NodeType::Milestone),
            count(NodeType::EnablingTechnology)
        ),
    ));

    // Impact tables are keyed by label
    let mut seen = HashSet::new();
    let duplicate_labels: Vec<&str> = graph
        .acceleratable_indices()
        .map(|i| graph.node(i).label.as_str())
        .filter(|l| !seen.insert(*l))
        .collect();
    results.push(TestResult::check(
        "tree_unique_labels",
        duplicate_labels.is_empty(),
        if duplicate_labels.is_empty() {
            "every technology label is unique".into()
        } else {
            format!("duplicate labels: {}", duplicate_labels.join(", "))
        },
    ));

    let orphans: Vec<&str> = graph
        .acceleratable_indices()
        .filter(|&i| graph.downstream_concepts(i).is_empty())
        .map(|i| graph.node(i).id.as_str())
        .collect();
    results.push(TestResult::check(
        "tree_every_tech_reaches_a_concept",
        orphans.is_empty(),
        if orphans.is_empty() {
            "all technologies feed at least one reactor concept".into()
        } else {
            format!("{} orphaned: {}", orphans.len(), orphans.join(", "))
        },
    ));

    let missing_readiness = graph
        .nodes()
        .iter()
        .filter(|n| n.readiness_level.is_none())
        .count();
    results.push(TestResult::check(
        "tree_readiness_present",
        missing_readiness == 0,
        format!("{} nodes without a readiness level", missing_readiness),
    ));

    if !quiet {
        for (id, degree) in graph.most_enabling(3) {
            println!("  enables {:>2}: {}", degree, id);
        }
        for (id, degree) in graph.bottlenecks(3) {
            println!("  requires {:>2}: {}", degree, id);
        }
    }

    Some(graph)
}

// ── 2. Seeded state ─────────────────────────────────────────────────────

fn validate_seed(graph: &TechGraph, config: &SimulationConfig, quiet: bool) -> Vec<TestResult> {
    if !quiet {
        println!("--- Seeded State ---");
    }
    let mut results = Vec::new();
    let snapshot = Snapshot::seed(graph, &config.readiness);

    let out_of_range = snapshot
        .states()
        .iter()
        .filter(|s| !(0.0..=1.0).contains(&s.prob_of_success) || s.time_remaining < 0.0)
        .count();
    results.push(TestResult::check(
        "seed_in_range",
        out_of_range == 0,
        format!("{} states out of range", out_of_range),
    ));

    let active = (0..graph.len())
        .filter(|&i| snapshot.status_of(graph, i) == TechStatus::Active)
        .filter(|&i| graph.node(i).node_type.is_acceleratable())
        .count();
    results.push(TestResult::check(
        "seed_has_active_work",
        active > 0,
        format!("{} technologies can progress in year one", active),
    ));

    results
}

// ── 3. Scheduler ────────────────────────────────────────────────────────

fn validate_scheduler(
    graph: &TechGraph,
    config: &SimulationConfig,
    quiet: bool,
) -> (Vec<TestResult>, ImpactSummary) {
    if !quiet {
        println!("--- Year-by-Year Scheduler ({} years) ---", SCHEDULER_YEARS);
    }
    let mut results = Vec::new();
    let scheduler = YearlyScheduler::new(graph, config);
    let tables = scheduler.run_simulation(SCHEDULER_YEARS);
    let summary = ImpactSummary::from_tables(&tables, config.start_year);

    let sparse_status = tables
        .status
        .values()
        .filter(|by_year| by_year.len() != SCHEDULER_YEARS as usize)
        .count();
    results.push(TestResult::check(
        "scheduler_status_dense",
        sparse_status == 0 && tables.status.len() == graph.acceleratable_indices().count(),
        format!("{} technologies tracked", tables.status.len()),
    ));

    let below_floor = tables
        .impact
        .values()
        .flat_map(|by_year| by_year.values())
        .filter(|&&v| v <= config.impact_noise_floor_twh)
        .count();
    results.push(TestResult::check(
        "scheduler_noise_floor",
        below_floor == 0,
        format!("{} entries at or below the floor", below_floor),
    ));

    // Completed is terminal
    let regressions = tables
        .status
        .values()
        .filter(|by_year| {
            by_year
                .values()
                .skip_while(|&&s| s != TechStatus::Completed)
                .any(|&s| s != TechStatus::Completed)
        })
        .count();
    results.push(TestResult::check(
        "scheduler_completion_terminal",
        regressions == 0,
        format!("{} technologies left Completed", regressions),
    ));

    results.push(TestResult::check(
        "scheduler_deterministic",
        scheduler.run_simulation(SCHEDULER_YEARS) == tables,
        "identical tables on rerun".into(),
    ));

    results.push(TestResult::check(
        "scheduler_finds_opportunities",
        summary.current_opportunities > 0,
        format!(
            "{} opportunities in {}, {} active overall, max {:.2} TWh",
            summary.current_opportunities,
            config.start_year,
            summary.active_techs,
            summary.max_impact_twh
        ),
    ));

    (results, summary)
}

// ── 4. Strategic ranking ────────────────────────────────────────────────

fn validate_strategic(
    graph: &TechGraph,
    config: &SimulationConfig,
    quiet: bool,
) -> (Vec<TestResult>, Vec<InvestmentOption>) {
    if !quiet {
        println!(
            "--- Strategic Ranking ({} years ahead) ---",
            config.default_years_ahead
        );
    }
    let mut results = Vec::new();
    let sim = StrategicSimulator::new(graph, config);
    let ranking =
        sim.find_optimal_long_term_investment(config.start_year, config.default_years_ahead);

    let floor = config.impact_noise_floor_twh;
    let positive = ranking
        .iter()
        .take_while(|o| o.cumulative_impact_twh > floor)
        .count();
    let sorted = ranking[..positive]
        .windows(2)
        .all(|w| w[0].cumulative_impact_twh >= w[1].cumulative_impact_twh);
    let partitioned = ranking[positive..]
        .iter()
        .all(|o| o.cumulative_impact_twh <= floor);
    results.push(TestResult::check(
        "strategic_ranking_order",
        sorted && partitioned,
        format!(
            "{} options, {} with positive long-term impact",
            ranking.len(),
            positive
        ),
    ));

    let acceleration_hurts = ranking
        .iter()
        .filter(|o| o.cumulative_impact_twh < -1e-9)
        .count();
    results.push(TestResult::check(
        "strategic_acceleration_never_hurts",
        acceleration_hurts == 0,
        format!("{} options lose energy when accelerated", acceleration_hurts),
    ));

    let rejects_concept = graph
        .concept_indices()
        .next()
        .map(|c| {
            sim.calculate_cumulative_impact(&graph.node(c).id, config.start_year, 1)
                .is_err()
        })
        .unwrap_or(true);
    results.push(TestResult::check(
        "strategic_rejects_concepts",
        rejects_concept,
        "reactor concepts are not investment targets".into(),
    ));

    (results, ranking)
}

fn print_ranking(ranking: &[InvestmentOption], verbose: bool) {
    let shown = if verbose { ranking.len() } else { ranking.len().min(5) };
    for (rank, option) in ranking.iter().take(shown).enumerate() {
        println!(
            "  {:>2}. {:<45} {:>10.3} TWh  (x{:.2})",
            rank + 1,
            option.investment_tech,
            option.cumulative_impact_twh,
            option.roi_multiple
        );
    }
}

// ── 5. Pathway outlook ──────────────────────────────────────────────────

fn validate_outlook(
    graph: &TechGraph,
    pathways: &[PathwayOutlook],
    enabling: &[EnablingAssessment],
    quiet: bool,
) -> Vec<TestResult> {
    if !quiet {
        println!("--- Pathway Outlook ---");
    }
    let mut results = Vec::new();

    results.push(TestResult::check(
        "outlook_covers_concepts",
        pathways.len() == graph.concept_indices().count(),
        format!("{} pathways", pathways.len()),
    ));

    let reachable = pathways.iter().filter(|p| p.deployment_year.is_some()).count();
    results.push(TestResult::check(
        "outlook_reachable",
        reachable > 0,
        format!("{} of {} pathways reachable", reachable, pathways.len()),
    ));

    let high = enabling.iter().filter(|e| e.priority == Priority::High).count();
    let medium = enabling.iter().filter(|e| e.priority == Priority::Medium).count();
    results.push(TestResult::check(
        "outlook_enabling_tiers",
        enabling.iter().all(|e| e.enabled_concepts > 0),
        format!(
            "{} enabling technologies: {} high, {} medium, {} low",
            enabling.len(),
            high,
            medium,
            enabling.len() - high - medium
        ),
    ));

    results
}
