use anyhow::{bail, Result};

use crate::cli::{Cli, VerifyArgs};
use crate::pack::verify_pack;

pub fn run(cli: &Cli, args: &VerifyArgs) -> Result<()> {
    let report = verify_pack(&args.pack_dir, args.public_key.as_deref())?;

    for failure in &report.failures {
        eprintln!("FAIL {failure}");
    }
    if cli.verbose > 0 {
        for s in &report.stats {
            eprintln!(
                "[verify] {}: {} values, range [{:.3}, {:.3}], mean {:.3}",
                s.name, s.count, s.min, s.max, s.mean
            );
        }
    }

    let status = |ok: bool| if ok { "ok" } else { "FAILED" };
    println!(
        "signature: {}{}",
        status(report.signature_ok),
        if report.signature_checked { "" } else { " (format only, no public key)" }
    );
    println!("parts: {}", status(report.parts_ok));
    println!("masks: {}", status(report.masks_ok));

    if !report.passed() {
        bail!("pack verification failed: {}", args.pack_dir.display());
    }
    println!("pack valid: {}", args.pack_dir.display());
    Ok(())
}
