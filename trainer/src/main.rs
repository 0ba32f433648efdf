use std::{env, fs::File, io::BufReader};

use anyhow::Context;
use log::info;
use machine_learning::{
    specs::TrainerSpec,
    training::{LogReporter, TrainerBuilder},
};

const DEMO_SPEC: &str = include_str!("../demo.json");
const DEFAULT_LOG_EVERY: usize = 10;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let spec = match env::var("TRAINER_CONFIG") {
        Ok(path) => {
            info!("reading the trainer spec from {path}");
            let file = File::open(&path).with_context(|| format!("failed to open {path}"))?;
            TrainerSpec::from_reader(BufReader::new(file))?
        }
        Err(_) => {
            info!("TRAINER_CONFIG is not set, running the demo spec");
            TrainerSpec::from_json(DEMO_SPEC)?
        }
    };

    let log_every = match env::var("TRAINER_LOG_EVERY") {
        Ok(every) => every.parse().context("TRAINER_LOG_EVERY must be a number")?,
        Err(_) => DEFAULT_LOG_EVERY,
    };

    let mut trainer = TrainerBuilder::new().build(&spec)?;
    let history = trainer.fit(&mut LogReporter::new(log_every))?;

    println!("{}", serde_json::to_string_pretty(&history)?);
    Ok(())
}
