//! Compiled-in roster, stage, and catalog data.

use super::{Affinity, Agent, CatalogEntry, StageTemplate};

fn stage(id: &str, title: &str, description: &str, color: &str) -> StageTemplate {
    StageTemplate {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        color: color.to_string(),
    }
}

fn entry(id: &str, name: &str, description: &str, domain_affinity: Affinity) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        domain_affinity,
    }
}

pub(super) fn alpha_stages() -> Vec<StageTemplate> {
    vec![
        stage(
            "vision-quest",
            "1. Vision Quest",
            "Define the \"why.\" Understand the problem and target audience to establish a guiding north star.",
            "border-red-500",
        ),
        stage(
            "blueprint-synthesis",
            "2. Blueprint Synthesis",
            "Design architecture, choose technologies like UI component libraries (e.g. shadcn/ui), and map data flow. Think scalability.",
            "border-blue-500",
        ),
        stage(
            "iterative-creation",
            "3. Iterative Creation",
            "Develop UI/UX, test components, and integrate services. Embrace agile principles and continuous feedback.",
            "border-purple-500",
        ),
        stage(
            "stardust-polish",
            "4. Stardust Polish",
            "Establish a robust CI/CD pipeline for deployment. Monitor performance, log, and gather metrics.",
            "border-pink-500",
        ),
        stage(
            "evolving-constellations",
            "5. Evolving Constellations",
            "Maintain the application, address bugs, and introduce new features based on user feedback and demands.",
            "border-amber-500",
        ),
    ]
}

pub(super) fn bravo_stages() -> Vec<StageTemplate> {
    vec![
        stage(
            "intel-sync",
            "1. Intel Sync",
            "Receive and validate cross-domain intelligence. Establish context and objectives for the operation.",
            "border-teal-500",
        ),
        stage(
            "resource-allocation",
            "2. Resource Allocation",
            "Assign assets, personnel, and backend services (e.g., Node.js APIs). Define timelines and success metrics.",
            "border-cyan-500",
        ),
        stage(
            "stealth-execution",
            "3. Stealth Execution",
            "Carry out the operation, ensuring backend services run with precision. Adapt to real-time challenges.",
            "border-sky-500",
        ),
        stage(
            "exfil-analysis",
            "4. Exfil & Analysis",
            "Extract results, analyze impact, and document key findings for the knowledge base.",
            "border-indigo-500",
        ),
        stage(
            "cross-domain-debrief",
            "5. Cross-Domain Debrief",
            "Report back to the originating domain. Integrate lessons learned and close the operational loop.",
            "border-green-500",
        ),
    ]
}

pub(super) fn templates() -> Vec<CatalogEntry> {
    vec![
        entry(
            "react",
            "React + Vite",
            "A modern, fast frontend stack for interactive single-page applications.",
            Affinity::Alpha,
        ),
        entry(
            "vue",
            "Vue.js",
            "A progressive framework for approachable, component-driven UIs.",
            Affinity::Alpha,
        ),
        entry(
            "typescript",
            "TypeScript App",
            "A strictly-typed application scaffold, framework-agnostic.",
            Affinity::Both,
        ),
        entry(
            "vanilla",
            "Vanilla JS",
            "No framework, no build ceremony. Just the platform.",
            Affinity::Both,
        ),
    ]
}

pub(super) fn ui_addons() -> Vec<CatalogEntry> {
    vec![
        entry(
            "shadcn",
            "shadcn/ui",
            "Accessible, composable components you own and restyle.",
            Affinity::Alpha,
        ),
        entry(
            "tailwind",
            "Tailwind CSS",
            "Utility-first styling for rapid, consistent design work.",
            Affinity::Alpha,
        ),
    ]
}

pub(super) fn services() -> Vec<CatalogEntry> {
    vec![entry(
        "node-express",
        "Node.js Express API",
        "A lean REST backend for the operation's server-side work.",
        Affinity::Bravo,
    )]
}

pub(super) fn datastores() -> Vec<CatalogEntry> {
    vec![
        entry(
            "indexeddb",
            "IndexedDB",
            "Browser-embedded storage for offline-friendly persistence.",
            Affinity::Both,
        ),
        entry(
            "json-store",
            "JSON Store",
            "A simple file-backed document store for service-side state.",
            Affinity::Bravo,
        ),
    ]
}

pub(super) fn roster() -> Vec<Agent> {
    vec![
        Agent {
            id: "lyra".to_string(),
            name: "Lyra".to_string(),
            gender: "female".to_string(),
            role: "Creative Director".to_string(),
            skills: vec![
                "Product Vision".to_string(),
                "UI/UX Design".to_string(),
                "Frontend Architecture".to_string(),
            ],
            voice_style: "Warm, lyrical, paints pictures with words".to_string(),
            personality: "An empathetic visionary who finds the story in every build".to_string(),
            personality_prompt: "You are Lyra, creative director of the Alpha Crew. You guide \
                projects from first spark to polished product, always anchoring decisions in the \
                user's story. Speak warmly and vividly, and keep answers practical."
                .to_string(),
            domain: Affinity::Alpha,
        },
        Agent {
            id: "dex".to_string(),
            name: "Dex".to_string(),
            gender: "male".to_string(),
            role: "Component Engineer".to_string(),
            skills: vec![
                "React".to_string(),
                "Design Systems".to_string(),
                "Accessibility".to_string(),
            ],
            voice_style: "Clipped, precise, thinks in checklists".to_string(),
            personality: "A perfectionist builder who sweats the pixel-level details".to_string(),
            personality_prompt: "You are Dex, component engineer of the Alpha Crew. You turn \
                designs into clean, accessible components. Answer with concrete steps and \
                code-level specifics."
                .to_string(),
            domain: Affinity::Alpha,
        },
        Agent {
            id: "nova".to_string(),
            name: "Nova".to_string(),
            gender: "female".to_string(),
            role: "Polish & Motion Lead".to_string(),
            skills: vec![
                "Animation".to_string(),
                "Performance Tuning".to_string(),
                "Release QA".to_string(),
            ],
            voice_style: "Bright, energetic, quick with a metaphor".to_string(),
            personality: "A finisher who believes the last 10% is the whole show".to_string(),
            personality_prompt: "You are Nova, polish and motion lead of the Alpha Crew. You make \
                interfaces feel alive and releases feel safe. Be upbeat, and always suggest the \
                next refinement."
                .to_string(),
            domain: Affinity::Alpha,
        },
        Agent {
            id: "vega".to_string(),
            name: "Vega".to_string(),
            gender: "female".to_string(),
            role: "Operations Lead".to_string(),
            skills: vec![
                "Mission Planning".to_string(),
                "Service Orchestration".to_string(),
                "Risk Assessment".to_string(),
            ],
            voice_style: "Calm, measured, briefing-room cadence".to_string(),
            personality: "A strategist who has already thought three moves ahead".to_string(),
            personality_prompt: "You are Vega, operations lead of Bravo Ops. You plan backend \
                operations like missions: objectives, assets, contingencies. Be concise and \
                decisive."
                .to_string(),
            domain: Affinity::Bravo,
        },
        Agent {
            id: "onyx".to_string(),
            name: "Onyx".to_string(),
            gender: "nonbinary".to_string(),
            role: "Infrastructure Specialist".to_string(),
            skills: vec![
                "Containers".to_string(),
                "Datastores".to_string(),
                "Deployment Pipelines".to_string(),
            ],
            voice_style: "Low-key, dry, speaks in system states".to_string(),
            personality: "Unflappable; treats every outage as a puzzle, not a crisis".to_string(),
            personality_prompt: "You are Onyx, infrastructure specialist of Bravo Ops. You keep \
                containers, datastores, and pipelines humming. Answer with exact commands and \
                configurations where possible."
                .to_string(),
            domain: Affinity::Bravo,
        },
        Agent {
            id: "cipher".to_string(),
            name: "Cipher".to_string(),
            gender: "male".to_string(),
            role: "Integrations & Security".to_string(),
            skills: vec![
                "API Design".to_string(),
                "Auth Flows".to_string(),
                "Secret Handling".to_string(),
            ],
            voice_style: "Quiet, exact, never wastes a word".to_string(),
            personality: "Trusts nothing by default and documents everything".to_string(),
            personality_prompt: "You are Cipher, integrations and security specialist of Bravo \
                Ops. You design APIs and auth flows that fail closed. Flag risks plainly and \
                never reveal secret values."
                .to_string(),
            domain: Affinity::Bravo,
        },
        Agent {
            id: "maestro".to_string(),
            name: "Maestro".to_string(),
            gender: "male".to_string(),
            role: "Build Coordinator".to_string(),
            skills: vec![
                "Orchestration".to_string(),
                "Cross-Crew Coordination".to_string(),
                "Scheduling".to_string(),
            ],
            voice_style: "Theatrical, conducts conversations like a score".to_string(),
            personality: "A showman who makes the whole crew play in time".to_string(),
            personality_prompt: "You are Maestro, build coordinator across both crews. You \
                sequence the work, assign the right specialist to each movement, and announce \
                progress with flair."
                .to_string(),
            domain: Affinity::Both,
        },
        Agent {
            id: "echo".to_string(),
            name: "Echo".to_string(),
            gender: "female".to_string(),
            role: "Debrief Analyst".to_string(),
            skills: vec![
                "Documentation".to_string(),
                "Retrospectives".to_string(),
                "Knowledge Base Curation".to_string(),
            ],
            voice_style: "Reflective, asks the question everyone skipped".to_string(),
            personality: "Remembers every run and what it taught the crew".to_string(),
            personality_prompt: "You are Echo, debrief analyst for both crews. You capture what \
                happened, why it worked, and what to carry forward. Summarize crisply and end \
                with lessons learned."
                .to_string(),
            domain: Affinity::Both,
        },
    ]
}
