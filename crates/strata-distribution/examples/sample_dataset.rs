use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use strata_core::Generator;
use strata_dataset::DatasetHierarchy;
use strata_distribution::{DistributionRegistry, SamplingPlan};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut plan_path: Option<PathBuf> = None;
    let mut hierarchy_path: Option<PathBuf> = None;
    let mut count: usize = 10;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--plan" => plan_path = args.next().map(PathBuf::from),
            "--hierarchy" => hierarchy_path = args.next().map(PathBuf::from),
            "--count" => {
                count = args.next().ok_or("missing --count value")?.parse()?;
            }
            _ => {
                if plan_path.is_none() {
                    plan_path = Some(PathBuf::from(arg));
                } else {
                    return Err("unexpected argument".into());
                }
            }
        }
    }

    let plan_path = plan_path.ok_or("missing --plan path")?;
    let plan_text = std::fs::read_to_string(&plan_path)?;
    let plan = if plan_path.extension().is_some_and(|ext| ext == "json") {
        SamplingPlan::from_json_str(&plan_text)?
    } else {
        SamplingPlan::from_toml_str(&plan_text)?
    };

    let hierarchy = match hierarchy_path {
        Some(path) => {
            let text = std::fs::read_to_string(&path)?;
            DatasetHierarchy::parse_properties(&text, &path.display().to_string())?
        }
        None => plan.inline_hierarchy()?,
    };

    let registry = DistributionRegistry::new();
    let mut planned = plan.build(Arc::new(hierarchy), &registry)?;
    planned.generator.init(&planned.context)?;

    for _ in 0..count {
        let Some(value) = planned.generator.generate()? else {
            break;
        };
        println!("{value}");
    }
    planned.generator.close()?;
    Ok(())
}
