use logship_cloud::prune::PruneReport;
use owo_colors::OwoColorize;

pub fn print_prune_human(report: &PruneReport) {
    if report.dry_run {
        println!("{}", "DRY RUN: no log groups were deleted".yellow());
    }
    println!(
        "active_stacks={} scanned={} old={}",
        report.active_stacks,
        report.scanned,
        report.old.len()
    );

    if report.dry_run {
        for group in &report.old {
            println!("{} {group}", "would delete".yellow());
        }
        return;
    }

    for group in &report.deleted {
        println!("{} {group}", "deleted".green());
    }
    for failed in &report.failed {
        println!("{} {} | {}", "failed".red(), failed.log_group, failed.error);
    }
    println!(
        "-- deleted {} of {} old log groups ({} failed) --",
        report.deleted.len(),
        report.old.len(),
        report.failed.len()
    );
}
