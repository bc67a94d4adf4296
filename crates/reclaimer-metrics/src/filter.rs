use crate::RawSample;
use reclaimer_core::UtilizationSample;
use tracing::debug;

/// Keep only rows that identify a pod.
///
/// The query aggregates by `pod` and `namespace`, but the backend returns a
/// dimensionless row when zero series match (e.g. no GPU workloads present);
/// such rows carry no actionable identity. Non-finite averages are dropped
/// for the same reason.
pub fn filter_candidates(rows: Vec<RawSample>, window: &str) -> Vec<UtilizationSample> {
    let mut candidates = Vec::with_capacity(rows.len());

    for row in rows {
        let (pod, namespace) = match (row.labels.get("pod"), row.labels.get("namespace")) {
            (Some(pod), Some(namespace)) => (pod.clone(), namespace.clone()),
            _ => {
                debug!("Dropping sample without pod identity: {:?}", row.labels);
                continue;
            }
        };
        if !row.value.is_finite() {
            debug!("Dropping non-finite sample for pod {}/{}", namespace, pod);
            continue;
        }

        candidates.push(UtilizationSample {
            pod_name: pod,
            namespace,
            accelerator_id: row.labels.get("gpu").cloned(),
            average_utilization: row.value,
            window: window.to_string(),
        });
    }

    candidates
}
