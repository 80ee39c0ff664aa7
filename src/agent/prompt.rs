//! Prompt construction for the MAPE cycle.

use std::fmt::Write;

use crate::agent::Action;
use crate::agent::Scratchpad;

/// Worked example shown to the model during the first cycles.
const EXAMPLE: &str = r#"Task: Make sure htop is installed on 10.0.4.17
M: terminal_run:
ops@workstation:~$
A: I am on my own machine. htop has to be checked on 10.0.4.17, so I need to log in there first.
P: ssh to 10.0.4.17 -> check htop -> install htop if missing -> end
E: terminal_run[ssh ops@10.0.4.17]

M: terminal_run:
ops@10.0.4.17:~$
A: I am logged in to the remote machine. I should check whether htop is installed.
P: check htop -> install htop if missing -> verify installation -> end
E: terminal_run[htop --version]

M: terminal_run:
	htop: command not found
	ops@10.0.4.17:~$
A: htop is missing, I need to install it.
P: install htop -> verify installation -> end
E: terminal_run[sudo apt-get install -y htop]

M: terminal_run:
[sudo] password for ops:
A: sudo needs a password that I do not have. I should ask for it.
P: ask for the password -> enter password -> verify installation -> end
E: ask[I need the sudo password for ops on 10.0.4.17 to install htop]

M: ask reply: s3cret
A: I have the password, I will type it into the terminal.
P: enter password -> verify installation -> end
E: terminal_run[s3cret]

M: terminal_run:
	...(12 lines omitted)
	Setting up htop (3.0.5-7build2) ...
	ops@10.0.4.17:~$
A: The installation finished. I should verify it.
P: verify installation -> end
E: terminal_run[htop --version]

M: terminal_run:
	htop 3.0.5
	ops@10.0.4.17:~$
A: htop is installed.
P: end
E: end
"#;

/// Build the model prompt for one cycle.
pub fn build_prompt(goal: &str, scratchpad: &Scratchpad, include_example: bool) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You are a deployment engineer agent who is good at deploying software. \
         Your goal is to carry out deployment tasks correctly and efficiently. \
         You have a terminal with Internet connectivity. You follow the MAPE \
         (Monitor, Analyze, Plan, Execute) cycle:\n\n\
         Monitor: what you can observe;\n\
         Analyze: what you should consider doing based on the observation;\n\
         Plan: the remaining steps, ending with `end`;\n\
         Execute: the one action you take now.\n\n\
         These are the actions you can take:\n",
    );
    for (index, action) in Action::ALL.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}: {}", index + 1, action.name(), action.description());
    }

    prompt.push_str(
        "\nGuidelines:\n\
         1. Do not upgrade the system unless you absolutely need to.\n\
         2. Do not copy the example below.\n\
         3. Finish as soon as the task is done.\n\
         4. When you are done, write `E: end`.\n",
    );

    if include_example {
        let _ = write!(prompt, "\n## Example\n{EXAMPLE}\n");
    }

    let _ = write!(prompt, "\nTask: {goal}\n{}", scratchpad.render());
    prompt.push_str(
        "\nPerform only ONE step of MAPE and provide the A, P and E lines. \
         Consider whether you can stop here.\n",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::TranscriptEntry;

    #[test]
    fn test_prompt_contains_goal_actions_and_transcript() {
        let mut pad = Scratchpad::new();
        pad.push(TranscriptEntry::monitor("terminal_run", "\nubuntu@host:~$"));

        let prompt = build_prompt("install vim", &pad, true);

        assert!(prompt.contains("Task: install vim\nM: terminal_run: \nubuntu@host:~$\n"));
        for action in Action::ALL {
            assert!(prompt.contains(action.name()));
        }
        assert!(prompt.contains("## Example"));
    }

    #[test]
    fn test_example_can_be_omitted() {
        let prompt = build_prompt("install vim", &Scratchpad::new(), false);
        assert!(!prompt.contains("## Example"));
        assert!(!prompt.contains("htop"));
    }
}
