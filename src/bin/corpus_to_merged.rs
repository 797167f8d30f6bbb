use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    ecb_tone::apps::run_corpus_to_merged_app(std::env::args().skip(1))
}
