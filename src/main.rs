use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use sheetplot::export;
use sheetplot::loader::{self, SheetFormat};
use sheetplot::parser::{self, ShellCommand};
use sheetplot::runtime::{self, Outcome};
use sheetplot::selection::{ChartKind, SelectionState, DEFAULT_TITLE};
use sheetplot::session::{Event, Session, View};
use sheetplot::telemetry;
use sheetplot::RenderOptions;

#[derive(Parser, Debug)]
#[command(name = "sheetplot")]
#[command(about = "Plot spreadsheet columns as a pastel line, scatter or bar chart and export a PNG", long_about = None)]
struct Args {
    /// Spreadsheet to plot (.xlsx, or .csv)
    #[arg(required_unless_present = "interactive")]
    file: Option<PathBuf>,

    /// X column (defaults to the first column)
    #[arg(long)]
    x: Option<String>,

    /// Y column; repeat for a second one
    #[arg(long = "y")]
    y: Vec<String>,

    /// Chart kind
    #[arg(long, value_enum, default_value_t = ChartKind::Line)]
    kind: ChartKind,

    /// Put the second Y column on a right-hand axis
    #[arg(long)]
    dual_axis: bool,

    /// Chart title, also used as the PNG file name
    #[arg(long, default_value = DEFAULT_TITLE)]
    title: String,

    /// Directory the PNG is written to
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Also write the on-screen rendering (SVG unless the options select png)
    #[arg(long, visible_alias = "display")]
    svg: Option<PathBuf>,

    /// Also write the figure as JSON
    #[arg(long)]
    figure_json: Option<PathBuf>,

    /// JSON file with display/export sizes
    #[arg(long)]
    options: Option<PathBuf>,

    /// Read commands from stdin instead of rendering once
    #[arg(long)]
    interactive: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _ = telemetry::init_default_tracing();

    let options = match &args.options {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read options file {}", path.display()))?;
            RenderOptions::from_json(&json)
                .with_context(|| format!("Invalid options file {}", path.display()))?
        }
        None => RenderOptions::default(),
    };

    if args.interactive {
        run_interactive(&args, options)
    } else {
        run_once(&args, &options)
    }
}

fn run_once(args: &Args, options: &RenderOptions) -> Result<()> {
    let path = args.file.as_ref().context("A spreadsheet file is required")?;
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let table = loader::load_table(&bytes, SheetFormat::from_path(path))
        .with_context(|| format!("Failed to load {}", path.display()))?;

    let selection = SelectionState {
        title: args.title.clone(),
        x_column: args
            .x
            .clone()
            .or_else(|| table.column_names().next().map(str::to_string)),
        y_columns: args.y.clone(),
        kind: args.kind,
        dual_axis: args.dual_axis,
    };

    let figure = match runtime::run_pipeline(&table, &selection, options)
        .context("Failed to build chart")?
    {
        Outcome::Prompt(msg) => {
            println!("{}", msg);
            return Ok(());
        }
        Outcome::Chart(figure) => figure,
    };

    let download = export::export_download(&figure, options.export)?;
    let png_path = write_download(&args.out, &download)?;
    println!("wrote {}", png_path.display());

    if let Some(display_path) = &args.svg {
        let bytes = export::render_display(&figure, options.format)?;
        fs::write(display_path, bytes)
            .with_context(|| format!("Failed to write {}", display_path.display()))?;
    }

    if let Some(json_path) = &args.figure_json {
        let json = serde_json::to_string_pretty(&figure).context("Failed to serialize figure")?;
        fs::write(json_path, json)
            .with_context(|| format!("Failed to write {}", json_path.display()))?;
    }

    Ok(())
}

fn write_download(dir: &Path, download: &export::Download) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(export::disk_file_name(&download.file_name));
    fs::write(&path, &download.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn run_interactive(args: &Args, options: RenderOptions) -> Result<()> {
    let mut session = Session::new(options);
    let stdin = io::stdin();
    let show_prompt = stdin.is_terminal();

    if let Some(path) = &args.file {
        load(&mut session, &path.to_string_lossy());
        if let Some(x) = &args.x {
            session.apply(Event::SelectX(x.clone()));
        }
        for y in &args.y {
            session.apply(Event::ToggleY(y.clone()));
        }
        session.apply(Event::SetKind(args.kind));
        session.apply(Event::SetDualAxis(args.dual_axis));
        print_view(&session.apply(Event::SetTitle(args.title.clone())));
    } else {
        print_view(&session.view());
    }

    let mut lines = stdin.lock().lines();
    loop {
        if show_prompt {
            print!("> ");
            io::stdout().flush().context("Failed to flush stdout")?;
        }
        let Some(line) = lines.next() else { break };
        let line = line.context("Failed to read from stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        let command = match parser::parse_line(&line) {
            Ok(command) => command,
            Err(msg) => {
                println!("{}", msg);
                continue;
            }
        };

        match command {
            ShellCommand::Load(path) => load(&mut session, &path),
            ShellCommand::Title(title) => print_view(&session.apply(Event::SetTitle(title))),
            ShellCommand::X(column) => print_view(&session.apply(Event::SelectX(column))),
            ShellCommand::Y(column) => print_view(&session.apply(Event::ToggleY(column))),
            ShellCommand::Kind(kind) => print_view(&session.apply(Event::SetKind(kind))),
            ShellCommand::Dual(on) => print_view(&session.apply(Event::SetDualAxis(on))),
            ShellCommand::Columns => {
                let columns = session.columns();
                if columns.is_empty() {
                    println!("no file loaded");
                }
                for (i, name) in columns.iter().enumerate() {
                    println!("{:>3}  {}", i, name);
                }
            }
            ShellCommand::Show => print_view(&session.view()),
            ShellCommand::Save(dir) => {
                let dir = dir.map_or_else(|| args.out.clone(), PathBuf::from);
                match session.export() {
                    Ok(download) => match write_download(&dir, &download) {
                        Ok(path) => println!("wrote {}", path.display()),
                        Err(err) => println!("error: {:#}", err),
                    },
                    Err(err) => println!("error: {}", err),
                }
            }
            ShellCommand::Help => println!("{}", parser::HELP),
            ShellCommand::Quit => break,
        }
    }

    Ok(())
}

fn load(session: &mut Session, path: &str) {
    match fs::read(path) {
        Ok(bytes) => print_view(&session.apply(Event::Upload {
            name: path.to_string(),
            bytes,
        })),
        Err(err) => println!("error: cannot read {}: {}", path, err),
    }
}

fn print_view(view: &View) {
    println!("{}", view);
}
