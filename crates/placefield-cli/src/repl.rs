//! REPL – Read-Eval-Print Loop for the interactive place-field shell.
//!
//! Supported slash-commands:
//!   /help                 – show this list
//!   /insert x y z [id]    – mark an obstacle, optionally owned by `id`
//!   /move x y z id        – move the single cell owned by `id`
//!   /delete x y z [id]    – clear a cell (only if `id` owns it, when given)
//!   /forget id            – clear every cell owned by `id`
//!   /apply file.json      – apply a JSON array of change records
//!   /cell x y z           – inspect the cell under a world point
//!   /examine x y z id     – ask whether a location is worth examining
//!   /visit x y z id       – record a visit
//!   /clear-examined       – forget all exploration history
//!   /stats                – map and exploration summary
//!   /snapshot file.json   – dump height slice 0 to disk
//!   /schema               – JSON schema of a change batch
//!   /quit | /exit         – exit the shell
//!
//! Every command that touches the map reads the step clock once.

use colored::Colorize;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use placefield_map::{BatchReport, PlaceField, StepClock};
use placefield_types::{ChangeRecord, ExamineTarget, Point3};

/// One parsed line of input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Insert { pos: Point3, id: Option<String> },
    Move { pos: Point3, id: String },
    Delete { pos: Point3, id: Option<String> },
    Forget(String),
    Apply(PathBuf),
    Cell(Point3),
    Examine(ExamineTarget),
    Visit(ExamineTarget),
    ClearExamined,
    Stats,
    Snapshot(PathBuf),
    Schema,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err("empty command".to_string());
        };
        let args: Vec<&str> = words.collect();

        let cmd = match name {
            "/help" => Command::Help,
            "/insert" => {
                let (pos, rest) = parse_point(&args, 0..=1)?;
                Command::Insert {
                    pos,
                    id: rest.first().map(|s| s.to_string()),
                }
            }
            "/move" => {
                let (pos, rest) = parse_point(&args, 1..=1)?;
                Command::Move {
                    pos,
                    id: rest[0].to_string(),
                }
            }
            "/delete" => {
                let (pos, rest) = parse_point(&args, 0..=1)?;
                Command::Delete {
                    pos,
                    id: rest.first().map(|s| s.to_string()),
                }
            }
            "/forget" => Command::Forget(single_arg(&args, "id")?.to_string()),
            "/apply" => Command::Apply(PathBuf::from(single_arg(&args, "file")?)),
            "/cell" => Command::Cell(parse_point(&args, 0..=0)?.0),
            "/examine" | "/visit" => {
                let (pos, rest) = parse_point(&args, 1..=1)?;
                let target = ExamineTarget::new(rest[0], pos);
                if name == "/examine" {
                    Command::Examine(target)
                } else {
                    Command::Visit(target)
                }
            }
            "/clear-examined" => Command::ClearExamined,
            "/stats" => Command::Stats,
            "/snapshot" => Command::Snapshot(PathBuf::from(single_arg(&args, "file")?)),
            "/schema" => Command::Schema,
            "/quit" | "/exit" => Command::Quit,
            other => return Err(format!("unknown command '{}'", other)),
        };
        Ok(cmd)
    }
}

fn single_arg<'a>(args: &[&'a str], what: &str) -> Result<&'a str, String> {
    match args {
        [one] => Ok(one),
        _ => Err(format!("expected exactly one {} argument", what)),
    }
}

/// Parse `x y z` followed by a number of trailing words within `extra`.
fn parse_point<'a>(
    args: &'a [&'a str],
    extra: std::ops::RangeInclusive<usize>,
) -> Result<(Point3, &'a [&'a str]), String> {
    if args.len() < 3 || !extra.contains(&(args.len() - 3)) {
        return Err(format!(
            "expected x y z followed by {}..={} argument(s)",
            extra.start(),
            extra.end()
        ));
    }
    let mut xyz = [0.0f32; 3];
    for (slot, raw) in xyz.iter_mut().zip(&args[..3]) {
        *slot = raw
            .parse()
            .map_err(|_| format!("'{}' is not a number", raw))?;
    }
    Ok((Point3::new(xyz[0], xyz[1], xyz[2]), &args[3..]))
}

/// A place field plus the step clock that stamps its updates.
pub struct Session {
    field: PlaceField,
    clock: StepClock,
}

impl Session {
    pub fn new(field: PlaceField) -> Self {
        Self {
            field,
            clock: StepClock::new(),
        }
    }

    #[cfg(test)]
    pub fn field(&self) -> &PlaceField {
        &self.field
    }

    fn apply(&mut self, changes: &[ChangeRecord]) -> BatchReport {
        self.field.apply_changes_with(changes, &self.clock)
    }

    /// Run one command.  Returns `false` when the shell should exit.
    pub fn execute(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Help => cmd_help(),
            Command::Insert { pos, id } => {
                let change = match id {
                    Some(id) => ChangeRecord::insert(pos, &id),
                    None => ChangeRecord::obstacle(pos),
                };
                print_report(&self.apply(&[change]));
            }
            Command::Move { pos, id } => {
                print_report(&self.apply(&[ChangeRecord::move_to(pos, &id)]));
            }
            Command::Delete { pos, id } => {
                let change = match id {
                    Some(id) => ChangeRecord::delete_owned_at(pos, &id),
                    None => ChangeRecord::delete_at(pos),
                };
                print_report(&self.apply(&[change]));
            }
            Command::Forget(id) => {
                print_report(&self.apply(&[ChangeRecord::forget(&id)]));
            }
            Command::Apply(path) => match load_changes(&path) {
                Ok(changes) => {
                    println!("  Applying {} record(s) from {}", changes.len(), path.display());
                    print_report(&self.apply(&changes));
                }
                Err(e) => println!("{}: {}", "Apply failed".red(), e),
            },
            Command::Cell(pos) => self.cmd_cell(pos),
            Command::Examine(target) => {
                if self.field.can_examine(&target) {
                    println!("  {} worth examining", "✓".green().bold());
                } else {
                    println!("  {} skip (too close or visited enough)", "✗".yellow().bold());
                }
            }
            Command::Visit(target) => {
                self.field.update(&target);
                println!(
                    "  Visit recorded ({} visit(s) here)",
                    self.field.exploration().visit_count(target.xyz)
                );
            }
            Command::ClearExamined => {
                self.field.clear_examined();
                println!("{}", "✓ Exploration history cleared.".green());
            }
            Command::Stats => self.cmd_stats(),
            Command::Snapshot(path) => match write_snapshot(&self.field, 0, &path) {
                Ok(()) => println!(
                    "{} {}",
                    "✓ Snapshot written to".green(),
                    path.display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Snapshot failed".red(), e),
            },
            Command::Schema => match batch_schema() {
                Ok(schema) => println!("{}", schema),
                Err(e) => println!("{}: {}", "Schema error".red(), e),
            },
            Command::Quit => return false,
        }
        true
    }

    fn cmd_cell(&self, pos: Point3) {
        let h = self.field.height_to_slice(pos.y);
        let (i, j) = self.field.real_to_cell(pos.x, pos.z, h);
        match self.field.cell_at(pos) {
            None => println!("  ({}, {}) is {}", i, j, "off the map".dimmed()),
            Some(cell) => {
                let owner = self
                    .field
                    .registry()
                    .token_of(cell.owner)
                    .unwrap_or("-");
                let state = if cell.occupied {
                    "occupied".red().bold()
                } else {
                    "free".green()
                };
                println!(
                    "  cell ({}, {}, slice {}) {}  owner={}  last_update={}",
                    i,
                    j,
                    h,
                    state,
                    owner.bold(),
                    cell.last_update
                );
            }
        }
    }

    fn cmd_stats(&self) {
        println!("{}", "Place Field".bold().underline());
        for h in self.field.grid().slices() {
            println!(
                "  slice {:<3} size {:>5}  occupied {}",
                h,
                self.field.slice_size(h),
                self.field.grid().occupied_count(h)
            );
        }
        println!("  identities       {}", self.field.registry().len());
        println!("  examined points  {}", self.field.exploration().len());
        println!("  clock            {}", self.clock.peek());
    }
}

/// Read a JSON array of change records.
pub fn load_changes(path: &Path) -> Result<Vec<ChangeRecord>, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&raw).map_err(|e| format!("Invalid change batch: {}", e))
}

/// Write height slice `h` of `field` as JSON.
pub fn write_snapshot(field: &PlaceField, h: usize, path: &Path) -> Result<(), String> {
    let snap = field
        .snapshot(h)
        .ok_or_else(|| format!("height slice {} does not exist", h))?;
    let raw = serde_json::to_string(&snap)
        .map_err(|e| format!("Failed to serialize snapshot: {}", e))?;
    fs::write(path, raw).map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}

/// Pretty JSON schema of `Vec<ChangeRecord>`.
pub fn batch_schema() -> Result<String, String> {
    let schema = schemars::schema_for!(Vec<ChangeRecord>);
    serde_json::to_string_pretty(&schema).map_err(|e| e.to_string())
}

fn print_report(report: &BatchReport) {
    if report.is_clean() {
        println!("  {} {} applied", "✓".green().bold(), report.applied);
        return;
    }
    println!(
        "  applied {}, skipped {}, failed {}",
        report.applied,
        report.skipped.to_string().yellow(),
        report.failures.len().to_string().red()
    );
    for failure in &report.failures {
        println!("    #{} {}", failure.index, failure.error.to_string().red());
    }
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(shutdown: Arc<AtomicBool>, mut session: Session) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "placefield>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match Command::parse(line) {
            Ok(cmd) => {
                if !session.execute(cmd) {
                    println!("{}", "Goodbye.".green());
                    shutdown.store(true, Ordering::SeqCst);
                    break;
                }
            }
            Err(e) => println!(
                "{} {}. Type {} for available commands.",
                "Error:".red(),
                e.yellow(),
                "/help".bold()
            ),
        }
    }
}

fn cmd_help() {
    println!();
    println!("{}", "Place Field Commands".bold().underline());
    println!("  {}  – mark an obstacle", "/insert x y z [id]".bold().cyan());
    println!("  {}      – move the cell owned by id", "/move x y z id".bold().cyan());
    println!("  {}  – clear a cell", "/delete x y z [id]".bold().cyan());
    println!("  {}           – clear every cell owned by id", "/forget id".bold().cyan());
    println!("  {}    – apply a JSON change batch", "/apply file.json".bold().cyan());
    println!("  {}         – inspect a cell", "/cell x y z".bold().cyan());
    println!("  {}   – is this worth examining?", "/examine x y z id".bold().cyan());
    println!("  {}     – record a visit", "/visit x y z id".bold().cyan());
    println!("  {}     – forget exploration history", "/clear-examined".bold().cyan());
    println!("  {}              – summary", "/stats".bold().cyan());
    println!("  {} – dump slice 0 as JSON", "/snapshot file.json".bold().cyan());
    println!("  {}             – change batch JSON schema", "/schema".bold().cyan());
    println!("  {}        – exit", "/quit  /exit".bold().cyan());
    println!();
}
