use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    ecb_tone::apps::run_analyze_features(std::env::args().skip(1))
}
