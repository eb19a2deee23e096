use super::try_string;
use crate::error::Result;

/// A named, aged record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativePerson {
    name: String,
    age: i32,
}

impl NativePerson {
    pub fn new(name: &str, age: i32) -> Result<Self> {
        Ok(Self {
            name: try_string(name)?,
            age,
        })
    }

    /// Replace name and age. On failure the record is unchanged.
    pub fn set(&mut self, name: &str, age: i32) -> Result<()> {
        self.name = try_string(name)?;
        self.age = age;
        Ok(())
    }

    pub fn set_age(&mut self, age: i32) {
        self.age = age;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn age(&self) -> i32 {
        self.age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_set() {
        let mut p = NativePerson::new("gopher", 10).unwrap();
        assert_eq!(p.name(), "gopher");
        assert_eq!(p.age(), 10);

        p.set("ferris", 8).unwrap();
        assert_eq!(p.name(), "ferris");
        assert_eq!(p.age(), 8);

        p.set_age(9);
        assert_eq!(p.name(), "ferris");
        assert_eq!(p.age(), 9);
    }
}
