use tempo_database::Database;
use tempo_slowmode::{Ingestor, SlowmodeSettings};

pub type Error = anyhow::Error;

#[derive(Clone, Debug)]
pub struct Data {
    pub db: Database,
    pub ingestor: Ingestor<Database>,
    pub settings: SlowmodeSettings,
}

pub type Context<'a> = poise::Context<'a, Data, Error>;
