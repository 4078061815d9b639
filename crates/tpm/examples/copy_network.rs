//! Copy Network: Tables, Inversion and Repertoires
//!
//! Run with: cargo run -p phi-tpm --example copy_network
//!
//! This example demonstrates:
//! - Building a table from a 2-D state-by-node array
//! - Inferring connectivity from the dynamics
//! - Conditioning and uniform-average marginalization
//! - The backward table of a system with background nodes
//! - Cause and effect repertoires
//!
//! Set `RUST_LOG=debug` to see the tracing events.

use ndarray::array;
use phi_core::{logging, TpmConfig};
use phi_tpm::{
    backward_tpm, forward_cause_repertoire, forward_effect_repertoire,
    unconstrained_cause_repertoire, unconstrained_effect_repertoire, Subsystem, Tpm, TpmError,
};

fn main() -> Result<(), TpmError> {
    logging::init();
    println!("=== Copy Network ===\n");

    // -------------------------------------------------------------------------
    // 1. The table
    // -------------------------------------------------------------------------
    println!("1. The table");
    println!("------------");
    println!("Node 0 copies node 1 and node 1 copies node 0.");
    let config = TpmConfig::default();
    let tpm = Tpm::with_config(
        array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]].into_dyn(),
        &config,
    )?;
    println!("  shape:         {:?}", tpm.shape());
    println!("  nodes:         {}", tpm.number_of_units());
    println!("  deterministic: {}", tpm.is_deterministic());
    println!();

    // -------------------------------------------------------------------------
    // 2. Connectivity
    // -------------------------------------------------------------------------
    println!("2. Connectivity inferred from the dynamics");
    println!("------------------------------------------");
    let cm = tpm.infer_cm()?;
    println!("{}", cm.as_array());
    println!("  strongly connected: {}", cm.is_strong(&[0, 1])?);
    println!();

    // -------------------------------------------------------------------------
    // 3. Conditioning and marginalization
    // -------------------------------------------------------------------------
    println!("3. Fix node 0 OFF, average over node 1");
    println!("--------------------------------------");
    let fixed = tpm.condition_tpm(&[(0, 0)].into_iter().collect())?;
    let marginal = fixed.marginalize_out(&[1])?;
    println!("  {marginal}");
    println!();

    // -------------------------------------------------------------------------
    // 4. Backward table
    // -------------------------------------------------------------------------
    println!("4. Backward table of node 0 given current state (1, 0)");
    println!("------------------------------------------------------");
    let backward = backward_tpm(&tpm, &[1, 0], &[0], true)?;
    println!("  {backward}");
    match backward_tpm(&tpm.marginalize_out(&[0, 1])?.expand_tpm()?, &[1, 0], &[0, 1], false) {
        Ok(_) => println!("  (1, 0) is reachable after averaging"),
        Err(err) => println!("  {err}"),
    }
    println!();

    // -------------------------------------------------------------------------
    // 5. Repertoires
    // -------------------------------------------------------------------------
    println!("5. Repertoires of mechanism {{n0}} over purview {{n1}}");
    println!("--------------------------------------------------");
    let subsystem = Subsystem::new(&tpm, &cm, &[1, 0], &[0, 1])?;
    let effect = forward_effect_repertoire(&subsystem, &[0], &[1])?;
    let cause = forward_cause_repertoire(&subsystem, &[0], &[1])?;
    println!("  effect:               {effect}");
    println!("  cause:                {cause}");
    println!(
        "  unconstrained effect: {}",
        unconstrained_effect_repertoire(&subsystem, &[0], &[1])?
    );
    println!(
        "  unconstrained cause:  {}",
        unconstrained_cause_repertoire(&subsystem, &[0], &[1])?
    );

    Ok(())
}
