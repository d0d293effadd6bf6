use rust_decimal::{Decimal, MathematicalOps};

/// Sum that reports overflow instead of panicking.
pub(crate) fn checked_sum<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

/// Arithmetic mean. `None` for an empty slice or on overflow.
pub(crate) fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    checked_sum(values.iter().copied())?.checked_div(Decimal::from(values.len() as u64))
}

/// Sample standard deviation (n - 1 denominator). `None` below two values or on overflow.
pub(crate) fn sample_std_dev(values: &[Decimal], mean: Decimal) -> Option<Decimal> {
    if values.len() < 2 {
        return None;
    }
    let mut ss = Decimal::ZERO;
    for v in values {
        let d = v.checked_sub(mean)?;
        ss = ss.checked_add(d.checked_mul(d)?)?;
    }
    let var = ss.checked_div(Decimal::from((values.len() - 1) as u64))?;
    var.sqrt()
}
