#![deny(clippy::all)]
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;

use chrono::NaiveDate;
use log::{info, warn};
use structopt::StructOpt;

use link_tool::dataset::LinkDataset;
use link_tool::filter::{distinct_values, LinkFilter, Range};
use link_tool::geo::LatLon;
use link_tool::stats::{Describe, Summary};
use link_tool::{error, map, sql, xlsx};

#[derive(StructOpt)]
#[structopt(
    name = "link_tool",
    about = "Microwave link inventory: DMS to decimal conversion and link distances"
)]
struct Args {
    /// Log debug output (RUST_LOG overrides)
    #[structopt(short, long)]
    verbose: bool,
    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt)]
struct Input {
    #[structopt(name = "input", parse(from_os_str))]
    path: PathBuf,
    #[structopt(long = "sheet", default_value = "Sheet2")]
    sheet: String,
}

#[derive(StructOpt)]
struct FilterArgs {
    #[structopt(long = "appl-id")]
    appl_ids: Vec<String>,
    #[structopt(long = "station")]
    stations: Vec<String>,
    #[structopt(long = "opposite")]
    opposites: Vec<String>,
    #[structopt(long)]
    freq_min: Option<f64>,
    #[structopt(long)]
    freq_max: Option<f64>,
    /// Minimum circuit length, km
    #[structopt(long)]
    dist_min: Option<f64>,
    /// Maximum circuit length, km
    #[structopt(long)]
    dist_max: Option<f64>,
    /// Earliest license expiry, YYYY-MM-DD
    #[structopt(long)]
    from: Option<NaiveDate>,
    /// Latest license expiry, YYYY-MM-DD
    #[structopt(long)]
    to: Option<NaiveDate>,
    /// Only links whose license has expired
    #[structopt(long)]
    expired: bool,
    /// Date to judge expiry against instead of the local date
    #[structopt(long)]
    today: Option<NaiveDate>,
}

impl FilterArgs {
    fn into_filter(self) -> LinkFilter {
        let today = self
            .today
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        LinkFilter {
            appl_ids: self.appl_ids,
            station_names: self.stations,
            opposite_names: self.opposites,
            freq: Range::new(self.freq_min, self.freq_max),
            distance: Range::new(self.dist_min, self.dist_max),
            from: self.from,
            to: self.to,
            expired_only: self.expired,
            ..LinkFilter::new(today)
        }
    }
}

#[derive(StructOpt)]
enum Command {
    /// Recompute decimal coordinates and circuit lengths, then save the edited workbook
    Derive {
        #[structopt(flatten)]
        input: Input,
        #[structopt(
            short = "o",
            long = "output",
            parse(from_os_str),
            default_value = "Data_Edited.xlsx"
        )]
        output: PathBuf,
    },
    /// Print link metrics and circuit-length statistics
    Summary {
        #[structopt(flatten)]
        input: Input,
        #[structopt(flatten)]
        filter: FilterArgs,
        /// Also list the distinct application ids and station names
        #[structopt(long)]
        list: bool,
    },
    /// Write the links as a GeoJSON map layer
    Map {
        #[structopt(flatten)]
        input: Input,
        #[structopt(flatten)]
        filter: FilterArgs,
        #[structopt(
            short = "o",
            long = "output",
            parse(from_os_str),
            default_value = "links.geojson"
        )]
        output: PathBuf,
    },
    /// Replace a SQLite table with the derived links
    ExportDb {
        #[structopt(flatten)]
        input: Input,
        #[structopt(flatten)]
        filter: FilterArgs,
        #[structopt(long = "db", parse(from_os_str), default_value = "links.sqlite")]
        db: PathBuf,
        #[structopt(long = "table", default_value = "balmon_links")]
        table: String,
    },
    /// Convert a DD-MM-SS.sssH coordinate pair to decimal degrees
    Convert { lat: String, lon: String },
}

fn load(input: &Input) -> error::Result<LinkDataset> {
    info!("Reading {} ({})...", input.path.display(), input.sheet);
    let table = xlsx::open_sheet(&input.path, Some(&input.sheet))?;
    let dataset = LinkDataset::from_table(&table)?;
    info!("Loaded {} links", dataset.len());
    if !dataset.rejected().is_empty() {
        warn!("{} rows could not be read:", dataset.rejected().len());
        for r in dataset.rejected() {
            warn!("  row {}: {}", r.row, r.error);
        }
    }
    Ok(dataset)
}

fn print_list(title: &str, values: Vec<String>) {
    println!("{} ({}):", title, values.len());
    for v in values {
        println!("  {}", v);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::from_args();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    match args.cmd {
        Command::Derive { input, output } => {
            let dataset = load(&input)?;
            info!(
                "Derived {} of {} links",
                dataset.valid_records().count(),
                dataset.len()
            );
            xlsx::save(&output, &input.sheet, &dataset.to_table_with_rejected())?;
            info!("Wrote {}", output.display());
        }
        Command::Summary {
            input,
            filter,
            list,
        } => {
            let dataset = load(&input)?;
            let filter = filter.into_filter();
            let links = filter.apply(dataset.records());
            info!("{} of {} links match", links.len(), dataset.len());

            println!("{}", Summary::of(links.iter().copied(), filter.today));
            match Describe::circuit_lengths(links.iter().copied()) {
                Some(d) => println!("Circuit length:  {}", d),
                None => println!("Circuit length:  no links with derived geometry"),
            }
            if list {
                print_list(
                    "Application ids",
                    distinct_values(links.iter().copied(), |r| r.appl_id.as_deref()),
                );
                print_list(
                    "Stations",
                    distinct_values(links.iter().copied(), |r| Some(r.station_name.as_str())),
                );
                print_list(
                    "Opposite stations",
                    distinct_values(links.iter().copied(), |r| {
                        Some(r.opposite_station.as_str())
                    }),
                );
            }
        }
        Command::Map {
            input,
            filter,
            output,
        } => {
            let dataset = load(&input)?;
            let filter = filter.into_filter();
            let links = filter.apply(dataset.records());
            let layer = map::link_layer(links.iter().copied(), filter.today);
            info!("Drawing {} features", layer.features.len());
            map::write_layer(&output, layer)?;
            info!("Wrote {}", output.display());
        }
        Command::ExportDb {
            input,
            filter,
            db,
            table,
        } => {
            let dataset = load(&input)?;
            let links = filter.into_filter().apply(dataset.records());
            sql::export_sqlite(&db, &table, &dataset.table_of(links))?;
        }
        Command::Convert { lat, lon } => {
            let point = LatLon::from_dms_text(&lat, &lon)?;
            println!("{:.6} {:.6}", point.lat(), point.lon());
            info!("{}", point.to_dms_string());
        }
    }

    Ok(())
}
