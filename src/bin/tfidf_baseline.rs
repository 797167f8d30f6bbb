use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    ecb_tone::apps::run_tfidf_baseline(std::env::args().skip(1))
}
