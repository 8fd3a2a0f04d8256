use rand::Rng;

/// One entry of the random berry gain table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainTier {
    /// Cumulative probability threshold, in the range 0..1
    pub threshold: f64,
    pub amount: u32,
}

impl GainTier {
    pub fn new(threshold: f64, amount: u32) -> Self {
        Self { threshold, amount }
    }
}

/// Rolls a random berry gain with a single draw against the cumulative table.
pub fn roll_gain<R>(table: &[GainTier], rng: &mut R) -> u32
where
    R: Rng + ?Sized,
{
    let draw: f64 = rng.gen();
    gain_for_draw(table, draw)
}

/// Returns the gain of the first tier whose threshold is above the draw.
pub fn gain_for_draw(table: &[GainTier], draw: f64) -> u32 {
    table
        .iter()
        .find(|tier| draw < tier.threshold)
        .map(|tier| tier.amount)
        .unwrap_or_default()
}

/// Returns how many berries are missing to afford the cost, if any.
pub fn missing_berries(balance: i64, cost: u32) -> Option<i64> {
    let missing = cost as i64 - balance;
    (missing > 0).then_some(missing)
}
