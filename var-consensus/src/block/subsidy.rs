//! The VAR block subsidy.
//!
//! The subsidy starts at the network's base amount and is scaled by a
//! `mul / div` rational once per reduction interval, declining
//! geometrically until it reaches zero.

use std::convert::TryFrom;

use var_chain::{
    amount::{Amount, NonNegative},
    block::Height,
    parameters::NetworkParams,
};

use crate::error::SubsidyError;

/// The `BlockSubsidy(height)` paid to the miner, in VAR atoms.
pub fn block_subsidy(height: Height, params: &NetworkParams) -> Result<Amount<NonNegative>, SubsidyError> {
    let schedule = &params.subsidy;
    let reductions = height.0 / schedule.reduction_interval;

    let mut subsidy = i128::from(schedule.base_subsidy);
    for _ in 0..reductions {
        if subsidy == 0 {
            break;
        }
        subsidy = subsidy * i128::from(schedule.mul_subsidy) / i128::from(schedule.div_subsidy);
    }

    let subsidy = i64::try_from(subsidy).map_err(|_| SubsidyError::SubsidyOverflow)?;
    Amount::try_from(subsidy).map_err(|_| SubsidyError::SubsidyOverflow)
}

#[cfg(test)]
mod test {
    use super::*;
    use color_eyre::Report;
    use var_chain::parameters::Network;

    #[test]
    fn block_subsidy_declines_geometrically() -> Result<(), Report> {
        var_test::init();

        for network in vec![Network::Mainnet, Network::Testnet] {
            let params = NetworkParams::for_network(network);
            let interval = params.subsidy.reduction_interval;

            let first = block_subsidy(Height(0), &params)?;
            assert_eq!(first.atoms(), params.subsidy.base_subsidy);

            // within the first interval, the subsidy is constant
            assert_eq!(block_subsidy(Height(interval - 1), &params)?, first);

            // one reduction applies mul/div once
            let second = block_subsidy(Height(interval), &params)?;
            assert_eq!(
                second.atoms(),
                params.subsidy.base_subsidy * params.subsidy.mul_subsidy
                    / params.subsidy.div_subsidy
            );
            assert!(second < first);

            // far enough out, the subsidy decays to zero
            let distant = block_subsidy(Height(interval.saturating_mul(10_000)), &params)?;
            assert_eq!(distant.atoms(), 0);
        }

        Ok(())
    }
}
