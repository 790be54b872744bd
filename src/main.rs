use clap::{App, Arg, ArgMatches};
use stackpress::build::build_site;
use stackpress::config::{Layout, SiteConfig};
use std::path::{Path, PathBuf};

fn main() {
    let matches = App::new("stackpress")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds a technical blog from a directory of markdown articles")
        .arg(
            Arg::with_name("root")
                .help("The project directory (contains posts/, templates/, config/)")
                .index(1)
                .default_value("."),
        )
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .takes_value(true)
                .value_name("FILE")
                .help("The site config file [default: <root>/config/site.json]"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .help("Logs more detail (repeat for debug output)"),
        )
        .get_matches();

    let level = match matches.occurrences_of("verbose") {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env = env_logger::Env::default().default_filter_or(level);
    env_logger::Builder::from_env(env).init();

    if let Err(e) = run(&matches) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let root = Path::new(matches.value_of("root").unwrap_or("."));
    let mut layout = Layout::from_root(root);
    if let Some(config_file) = matches.value_of("config") {
        layout = layout.with_config_file(PathBuf::from(config_file));
    }

    let config = SiteConfig::from_file(&layout.config_file)?;
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();

    println!("Building site in {}", root.display());
    let summary = build_site(&layout, &config, &today)?;
    print!("{}", summary);
    Ok(())
}
