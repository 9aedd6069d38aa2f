//! Export GeoJSON stylé avec geozero (streaming)
//!
//! Chaque feature porte sa couleur de remplissage, sa catégorie et la valeur
//! de la métrique, prête pour un rendu statique.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use choropleth::{ActiveMetric, Category, Feature, FeatureCollection};
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;
use serde_json::{json, Map, Value};

/// Exporte une collection classée par la métrique active
pub fn export_styled(
    collection: &FeatureCollection,
    metric: &ActiveMetric<'_>,
    output_path: &Path,
) -> Result<()> {
    let file = File::create(output_path)
        .context(format!("Failed to create file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    write_collection(&mut writer, collection, metric)?;
    writer.flush()?;

    Ok(())
}

fn write_collection<W: Write>(
    writer: &mut W,
    collection: &FeatureCollection,
    metric: &ActiveMetric<'_>,
) -> Result<()> {
    write!(writer, r#"{{"type":"FeatureCollection","metric":"#)?;
    serde_json::to_writer(&mut *writer, metric.name)?;
    write!(writer, ",")?;
    match collection.year() {
        Some(year) => write!(writer, r#""year":{},"#, year)?,
        None => write!(writer, r#""year":null,"#)?,
    }
    write!(writer, r#""features":["#)?;

    for (i, feature) in collection.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write_feature(writer, feature, metric)?;
    }

    write!(writer, "]}}")?;
    Ok(())
}

/// Écrit une feature en GeoJSON
fn write_feature<W: Write>(writer: &mut W, feature: &Feature, metric: &ActiveMetric<'_>) -> Result<()> {
    write!(writer, r#"{{"type":"Feature","id":"#)?;
    serde_json::to_writer(&mut *writer, &feature.id)?;

    write!(writer, r#","geometry":"#)?;
    match &feature.geometry {
        Some(geometry) => {
            let mut geom_buf = Vec::new();
            let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
            geometry.process_geom(&mut geom_writer)?;
            writer.write_all(&geom_buf)?;
        }
        None => write!(writer, "null")?,
    }

    let category = metric.classify(feature);
    write!(writer, r#","properties":"#)?;
    serde_json::to_writer(&mut *writer, &properties(feature, metric, category))?;
    write!(writer, "}}")?;

    Ok(())
}

fn properties(feature: &Feature, metric: &ActiveMetric<'_>, category: Category) -> Value {
    let mut props = Map::new();
    props.insert("id".into(), json!(feature.id));
    if let Some(name) = &feature.properties.name {
        props.insert("name".into(), json!(name));
    }
    if let Some(region) = &feature.properties.region {
        props.insert("region".into(), json!(region));
    }
    props.insert("year".into(), json!(feature.properties.year));
    props.insert("value".into(), json!(feature.metric(metric.name)));
    props.insert(
        "category".into(),
        match category {
            Category::Bucket(i) => json!(i),
            Category::NoData => json!("no_data"),
        },
    );
    props.insert("fill".into(), json!(metric.color(category)));
    Value::Object(props)
}
