use strata_distribution::DistributionRegistry;

fn main() {
    let registry = DistributionRegistry::new();
    for id in registry.ids() {
        println!("{id}");
    }
}
