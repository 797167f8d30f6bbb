use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    ecb_tone::apps::run_ingest_normalize(std::env::args().skip(1))
}
