/// A bounded option, with a name for use in messages.
#[derive(Clone, Debug)]
pub struct ConfigOption<T> {
    pub name: &'static str,
    pub min: T,
    pub max: T,
    pub value: T,
}

impl<T: PartialOrd> ConfigOption<T> {
    /// Whether the value lies within the bounds of the option.
    pub fn in_bounds(&self) -> bool {
        self.min <= self.value && self.value <= self.max
    }
}
