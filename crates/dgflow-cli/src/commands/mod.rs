pub mod check;
pub mod run;

use crate::cases::Case;

pub fn list_cases() -> anyhow::Result<()> {
    for case in Case::ALL {
        println!("{:<22} {}", case.name(), case.description());
    }
    Ok(())
}
