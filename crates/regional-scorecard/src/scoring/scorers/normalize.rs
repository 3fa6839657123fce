const FLAT_RANGE: f64 = 1e-12;

/// Run-wide minimum and maximum of one metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Extrema {
    min: f64,
    max: f64,
}

impl Extrema {
    pub(crate) fn of<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        values.into_iter().fold(None, |acc, value| match acc {
            None => Some(Self {
                min: value,
                max: value,
            }),
            Some(Self { min, max }) => Some(Self {
                min: min.min(value),
                max: max.max(value),
            }),
        })
    }

    /// Min-max normalization into `[0, 1]`. A flat range (every region equal)
    /// normalizes to 1.0.
    pub(crate) fn normalize(&self, value: f64) -> f64 {
        let range = self.max - self.min;
        if range.abs() <= FLAT_RANGE {
            return 1.0;
        }
        ((value - self.min) / range).clamp(0.0, 1.0)
    }
}
