//! Stage 1: download the municipality register from the IBGE API.

use anyhow::Result;

use popbr::br::Brazil;
use popbr::getter::Getter;
use popbr::{config, table};

#[tokio::main]
async fn main() -> Result<()> {
    popbr::init_tracing();

    let mut source = Brazil::new()?;
    let municipalities = source.municipalities().await?;
    println!("Municipios recebidos: {}", municipalities.len());

    let mut df = table::municipalities_to_df(&municipalities)?;
    println!("{}", df.head(Some(5)));

    let path = config::raw_dir().join("municipios.csv");
    table::write_df(&path, &mut df)?;
    println!("Gravado: {}", path.display());
    Ok(())
}
