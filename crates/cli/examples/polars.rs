use polars::prelude::*;

// per-course dropout rate with the lazy API, e.g.
// cargo run --example polars -- data/dados_alunos_md.csv Integrado
fn main() -> PolarsResult<()> {
    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .unwrap_or("data/dados_alunos_md.csv".to_string());
    let modality = args.next().unwrap_or("Integrado".to_string());

    let q = LazyCsvReader::new(path)
        .with_has_header(true)
        .finish()?
        .filter(col("modalidade").eq(lit(modality.as_str())))
        .with_column(
            col("situacao")
                .eq(lit("Evasão"))
                .cast(DataType::UInt32)
                .alias("evasao"),
        )
        .group_by(vec![col("curso")])
        .agg([
            col("alunoid").count().alias("total_alunos_curso"),
            col("evasao").sum().alias("total_evadidos_curso"),
        ])
        .with_column(
            (col("total_evadidos_curso").cast(DataType::Float64)
                / col("total_alunos_curso").cast(DataType::Float64)
                * lit(100.0))
            .alias("taxa_evasao"),
        )
        .sort(["curso"], SortMultipleOptions::default());

    let df = q.collect()?;

    println!("{}", df);
    Ok(())
}
