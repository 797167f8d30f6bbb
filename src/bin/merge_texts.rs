use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    ecb_tone::apps::run_merge_texts(std::env::args().skip(1))
}
