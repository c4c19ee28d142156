//! K-means and agglomerative clustering.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{numeric_requests, CategoryHandler, HandlerContext};
use crate::data::Role;
use crate::engine::{EngineArg, EngineError, EngineOutput};
use crate::error::{Result, TabstatError};
use crate::extract::MatrixBuilder;
use crate::methods::{Category, ClusteringMethod, MethodId};
use crate::result::{interpret, AnalysisOutput, CategoryDetails, ClusteringDetails, ResultTable};

const DEFAULT_CLUSTERS: usize = 3;
const LINKAGES: [&str; 4] = ["ward", "complete", "average", "single"];

#[derive(Debug, Default, Clone, Copy)]
pub struct ClusteringHandler;

#[async_trait]
impl CategoryHandler for ClusteringHandler {
    type Method = ClusteringMethod;

    fn category(&self) -> Category {
        Category::Clustering
    }

    #[instrument(skip_all, fields(method = method.id()))]
    async fn handle(
        &self,
        method: ClusteringMethod,
        ctx: &HandlerContext<'_>,
    ) -> Result<AnalysisOutput> {
        let id = MethodId::Clustering(method);
        id.check_roles(ctx.roles())?;

        let linkage = match method {
            ClusteringMethod::KMeans => None,
            ClusteringMethod::Hierarchical => Some(linkage(ctx)?),
        };
        let variables = ctx.columns(Role::Variables);
        let aligned = ctx.extract(id, &numeric_requests(Role::Variables, &variables))?;
        let n = aligned.len();
        let k = ctx.options().n_clusters.unwrap_or(DEFAULT_CLUSTERS);
        if k < 2 {
            return Err(TabstatError::validation(format!(
                "at least 2 clusters required (got {k})"
            )));
        }
        aligned.require_rows(k, id.display_name())?;
        let matrix = MatrixBuilder::new(&aligned).row_major(&variables)?;

        let mut args = vec![EngineArg::Matrix(matrix), EngineArg::Scalar(k as f64)];
        if let Some(linkage) = &linkage {
            args.push(EngineArg::Text(linkage.clone()));
        }
        let raw = ctx.invoke(id, args).await?;

        let labels = cluster_labels(&raw, n)?;
        let sizes = match raw.optional_numbers("clusterSizes")? {
            Some(sizes) => sizes.into_iter().map(|s| s.max(0.0) as usize).collect(),
            None => sizes_from_labels(&labels),
        };
        let silhouette = raw.optional_number("silhouetteScore")?;
        let centers = raw.optional_matrix("centers")?;
        debug!(n, clusters = sizes.len(), "Clustering complete");

        let fmt = ctx.format();
        let mut header = vec!["Cluster".to_string(), "Size".to_string()];
        header.extend(variables.iter().map(|v| v.to_string()));
        let mut table = ResultTable::new("Clusters", header);
        for (i, size) in sizes.iter().enumerate() {
            let mut cells = vec![(i + 1).to_string(), fmt.integer(*size)];
            if let Some(center) = centers.as_ref().and_then(|c| c.get(i)) {
                cells.extend(center.iter().map(|v| fmt.number(*v)));
            }
            table.push_row(cells);
        }

        let clusters = sizes.len();
        let mut out = AnalysisOutput::new(
            id,
            CategoryDetails::Clustering(ClusteringDetails {
                labels: Some(labels),
                cluster_sizes: Some(sizes.clone()),
                silhouette_score: silhouette,
                centers,
                linkage: linkage.clone(),
            }),
        );
        out.metric("N", fmt.integer(n));
        out.metric("Clusters", fmt.integer(clusters));
        if let Some(s) = silhouette {
            out.metric("Silhouette", fmt.number(s));
        }
        if let Some(linkage) = &linkage {
            out.metric("Linkage", linkage.clone());
        }
        out.table(table);

        let sizes_text = sizes
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        out.interpretation = match silhouette {
            Some(s) => format!(
                "{n} observations form {clusters} clusters (sizes {sizes_text}) with {} structure (silhouette = {}).",
                interpret::cluster_structure(s),
                fmt.number(s)
            ),
            None => format!("{n} observations form {clusters} clusters (sizes {sizes_text})."),
        };
        Ok(out)
    }
}

fn linkage(ctx: &HandlerContext<'_>) -> Result<String> {
    let linkage = ctx
        .options()
        .linkage
        .as_deref()
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| LINKAGES[0].to_string());
    if LINKAGES.contains(&linkage.as_str()) {
        Ok(linkage)
    } else {
        Err(TabstatError::validation(format!(
            "unknown linkage '{linkage}' (expected one of: {})",
            LINKAGES.join(", ")
        )))
    }
}

/// One non-negative integer label per clustered observation.
fn cluster_labels(raw: &EngineOutput, n: usize) -> Result<Vec<usize>> {
    let values = raw.numbers("labels")?;
    let invalid = || EngineError::InvalidField {
        routine: raw.routine().to_string(),
        field: "labels".to_string(),
        expected: format!("{n} non-negative integer labels"),
    };
    if values.len() != n {
        return Err(invalid().into());
    }
    values
        .into_iter()
        .map(|v| {
            if v >= 0.0 && v.fract() == 0.0 {
                Ok(v as usize)
            } else {
                Err(invalid().into())
            }
        })
        .collect()
}

fn sizes_from_labels(labels: &[usize]) -> Vec<usize> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(*label).or_default() += 1;
    }
    counts.into_values().collect()
}
