use strata_distribution::sampling_plan_json_schema;

fn main() {
    let schema = sampling_plan_json_schema();
    let json = serde_json::to_string_pretty(&schema).expect("serialize sampling plan json schema");
    println!("{json}");
}
