use crate::codes::*;
use crate::internal::Int;
use crate::stats::*;

/// Logs the statistics filled in by [`amd_with`](crate::amd_with) at info
/// level.
pub fn amd_report(stats: &[Int; STATS]) {
    print_report("amd", stats)
}

fn print_report(method: &str, stats: &[Int; STATS]) {
    if stats[STATUS] >= 0 {
        log::info!("{}: OK.", method);
    } else {
        log::info!("{}: ERROR.", method);
    }

    match stats[STATUS] {
        OK | OK_BUT_RECTANGULAR => {
            if stats[STATUS] == OK_BUT_RECTANGULAR {
                log::info!("{}: matrix is rectangular, ordered A'A instead of A+A'.", method);
            }
            log::info!(
                "{}: order of the graph:                            {}",
                method,
                stats[INFO1]
            );
            log::info!(
                "{}: number of off-diagonal entries:                {}",
                method,
                stats[INFO2]
            );
            log::info!(
                "{}: number of dense nodes ordered last:            {}",
                method,
                stats[DENSE]
            );
            log::info!(
                "{}: largest element degree:                        {}",
                method,
                stats[INFO3]
            );
            log::info!(
                "{}: number of garbage collections performed:       {}",
                method,
                stats[DEFRAG_COUNT]
            );
        }
        ERROR_OUT_OF_MEMORY => {
            log::info!("{}: out of memory.", method);
        }
        _ => {}
    }
}
