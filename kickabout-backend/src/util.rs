use rand::{distributions::Alphanumeric, thread_rng, Rng};

pub fn random_string(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

/// A zero padded numeric code, like the ones identity providers mail out
pub fn numeric_code(digits: u32) -> String {
    let ceiling = 10_u32.pow(digits);
    let value = thread_rng().gen_range(0..ceiling);

    format!("{:0width$}", value, width = digits as usize)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_numeric_code_shape() {
        for _ in 0..50 {
            let code = numeric_code(6);

            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
