use std::sync::Arc;
use std::{env, fs, path::PathBuf};

use repast::{Catalog, QueryRequest, SqlBuilder};

fn usage() {
    eprintln!("Usage: print_sql <request_json>");
    eprintln!("Example: cargo run --example print_sql -- requests/sales_by_channel.json");
}

fn main() -> anyhow::Result<()> {
    repast::init_tracing();

    let mut args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        usage();
        std::process::exit(1);
    }

    let request_path = PathBuf::from(args.remove(0));
    let request_str = fs::read_to_string(request_path)?;
    let request: QueryRequest = serde_json::from_str(&request_str)?;

    let builder = SqlBuilder::new(Arc::new(Catalog::builtin().clone()));
    let compiled = builder.build(&request)?;
    println!("{}", compiled.primary.sql);
    for (i, param) in compiled.primary.params.iter().enumerate() {
        println!("  ${} = {}", i + 1, param);
    }
    if let Some(comparison) = compiled.comparison {
        println!("-- comparison window --");
        println!("{}", comparison.sql);
        for (i, param) in comparison.params.iter().enumerate() {
            println!("  ${} = {}", i + 1, param);
        }
    }
    Ok(())
}
