use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    ecb_tone::apps::run_finbert_tone(std::env::args().skip(1))
}
